// Identity provider client: authorization code flow with PKCE
use crate::client::error::AuthError;
use crate::domain::auth_config::PublicAuthConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const SCOPE: &str = "openid profile email offline_access";
const REFRESH_MARGIN_SECS: i64 = 60;
const MAX_PENDING_LOGINS: usize = 8;
const PENDING_LOGIN_TTL_SECS: i64 = 15 * 60;

/// Profile of the signed-in user as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserProfile {
    pub fn attribute_str(&self, namespace: &str, key: &str) -> Option<&str> {
        self.attributes
            .get(&format!("{}{}", namespace, key))
            .and_then(Value::as_str)
    }

    pub fn preferred_language(&self, namespace: &str) -> Option<&str> {
        self.attribute_str(namespace, "language")
    }

    pub fn display_name(&self, namespace: &str) -> Option<&str> {
        self.attribute_str(namespace, "firstName")
            .or(self.name.as_deref())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's login page; the caller navigates there
    async fn login(&self) -> Url;

    /// Ends the local session and returns the provider's logout URL
    async fn logout(&self) -> Url;

    async fn is_authenticated(&self) -> bool;

    async fn get_user(&self) -> Option<UserProfile>;

    /// Current bearer token, refreshed without user interaction when possible
    async fn get_token_silently(&self) -> Result<String, AuthError>;

    /// Completes a login redirect and returns `url` without `code`/`state`
    async fn handle_redirect_callback(&self, url: &Url) -> Result<Url, AuthError>;
}

pub fn has_redirect_params(url: &Url) -> bool {
    redirect_params(url).is_some()
}

fn redirect_params(url: &Url) -> Option<(String, String)> {
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }
    Some((code?, state?))
}

/// Drops `code` and `state` from the query, keeping everything else
pub fn strip_redirect_params(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "code" && key != "state")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// S256 code challenge for a PKCE verifier
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// A login started with `login()` and not yet completed by its callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

impl PendingLogin {
    pub fn new(code_verifier: String) -> Self {
        Self {
            code_verifier,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(PENDING_LOGIN_TTL_SECS)
    }
}

/// Keeps pending logins across the navigation to the provider and back.
/// The page host backs this with storage that survives a reload.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, state: String, login: PendingLogin);

    /// Removes and returns the login for `state`; expired entries are never returned
    async fn take(&self, state: &str) -> Option<PendingLogin>;

    async fn clear(&self);
}

/// Process-local store holding at most `capacity` unexpired logins
pub struct MemoryTransactionStore {
    capacity: usize,
    pending: Mutex<HashMap<String, PendingLogin>>,
}

impl MemoryTransactionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryTransactionStore {
    fn default() -> Self {
        Self::new(MAX_PENDING_LOGINS)
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn save(&self, state: String, login: PendingLogin) {
        let now = Utc::now();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, existing| !existing.is_expired(now));

        while pending.len() >= self.capacity {
            let oldest = pending
                .iter()
                .min_by_key(|(_, existing)| existing.created_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    pending.remove(&key);
                }
                None => break,
            }
        }
        pending.insert(state, login);
    }

    async fn take(&self, state: &str) -> Option<PendingLogin> {
        let login = self.pending.lock().await.remove(state)?;
        (!login.is_expired(Utc::now())).then_some(login)
    }

    async fn clear(&self) {
        self.pending.lock().await.clear();
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    86_400
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    user: Option<UserProfile>,
}

impl Session {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Default)]
struct IdentityState {
    session: Option<Session>,
}

pub struct HostedIdentityClient {
    http: reqwest::Client,
    client_id: String,
    audience: String,
    origin: String,
    authorize_url: Url,
    token_url: Url,
    userinfo_url: Url,
    logout_url: Url,
    transactions: Arc<dyn TransactionStore>,
    state: Mutex<IdentityState>,
}

impl HostedIdentityClient {
    /// `config.domain` is a bare host ("tenant.eu.auth0.com") or a full base URL
    pub fn new(
        config: &PublicAuthConfig,
        page_url: &Url,
        timeout: std::time::Duration,
    ) -> Result<Self, AuthError> {
        let base = provider_base_url(&config.domain)?;
        let endpoint = |path: &str| base.join(path).map_err(|e| AuthError::Provider(e.to_string()));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            audience: config.audience.clone(),
            origin: page_url.origin().ascii_serialization(),
            authorize_url: endpoint("authorize")?,
            token_url: endpoint("oauth/token")?,
            userinfo_url: endpoint("userinfo")?,
            logout_url: endpoint("v2/logout")?,
            transactions: Arc::new(MemoryTransactionStore::default()),
            state: Mutex::new(IdentityState::default()),
        })
    }

    /// Replaces the in-memory transaction store with one the host persists
    pub fn with_transaction_store(mut self, transactions: Arc<dyn TransactionStore>) -> Self {
        self.transactions = transactions;
        self
    }

    async fn request_tokens(&self, body: Value) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ProviderErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error_description.or(body.error))
                .unwrap_or_else(|| status.to_string());
            return Err(AuthError::Provider(detail));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        self.http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json::<UserProfile>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

fn expiry_from_now(expires_in: i64) -> Result<DateTime<Utc>, AuthError> {
    Duration::try_seconds(expires_in)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AuthError::Provider(format!("invalid expires_in {}", expires_in)))
}

fn provider_base_url(domain: &str) -> Result<Url, AuthError> {
    let raw = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };

    let mut url = Url::parse(&raw).map_err(|e| AuthError::Provider(e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl IdentityProvider for HostedIdentityClient {
    async fn login(&self) -> Url {
        let state = Uuid::new_v4().simple().to_string();
        let verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let challenge = pkce_challenge(&verifier);

        self.transactions
            .save(state.clone(), PendingLogin::new(verifier))
            .await;

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.origin)
            .append_pair("audience", &self.audience)
            .append_pair("scope", SCOPE)
            .append_pair("state", &state)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");
        url
    }

    async fn logout(&self) -> Url {
        self.state.lock().await.session = None;
        self.transactions.clear().await;

        let mut url = self.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("returnTo", &self.origin);
        url
    }

    async fn is_authenticated(&self) -> bool {
        let state = self.state.lock().await;
        state
            .session
            .as_ref()
            .is_some_and(|s| s.is_fresh(Utc::now()) || s.refresh_token.is_some())
    }

    async fn get_user(&self) -> Option<UserProfile> {
        let state = self.state.lock().await;
        state.session.as_ref().and_then(|s| s.user.clone())
    }

    async fn get_token_silently(&self) -> Result<String, AuthError> {
        let refresh_token = {
            let mut state = self.state.lock().await;
            let Some(session) = state.session.as_ref() else {
                return Err(AuthError::LoginRequired);
            };
            if session.is_fresh(Utc::now()) {
                return Ok(session.access_token.clone());
            }
            match session.refresh_token.clone() {
                Some(token) => token,
                None => {
                    state.session = None;
                    return Err(AuthError::LoginRequired);
                }
            }
        };

        let tokens = match self
            .request_tokens(json!({
                "grant_type": "refresh_token",
                "client_id": self.client_id,
                "refresh_token": refresh_token,
            }))
            .await
        {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::warn!(error = %err, "Silent token refresh failed");
                self.state.lock().await.session = None;
                return Err(AuthError::LoginRequired);
            }
        };

        let expires_at = expiry_from_now(tokens.expires_in)?;
        let mut state = self.state.lock().await;
        let Some(session) = state.session.as_mut() else {
            // logged out while the refresh was in flight
            return Err(AuthError::LoginRequired);
        };
        session.access_token = tokens.access_token.clone();
        session.expires_at = expires_at;
        if let Some(rotated) = tokens.refresh_token {
            session.refresh_token = Some(rotated);
        }
        Ok(tokens.access_token)
    }

    async fn handle_redirect_callback(&self, url: &Url) -> Result<Url, AuthError> {
        let (code, state) = redirect_params(url).ok_or(AuthError::MissingCallbackParams)?;

        let login = self
            .transactions
            .take(&state)
            .await
            .ok_or_else(|| AuthError::InvalidState(state.clone()))?;

        let tokens = self
            .request_tokens(json!({
                "grant_type": "authorization_code",
                "client_id": self.client_id,
                "code": code,
                "code_verifier": login.code_verifier,
                "redirect_uri": self.origin,
            }))
            .await?;
        let expires_at = expiry_from_now(tokens.expires_in)?;
        let user = self.fetch_user(&tokens.access_token).await?;

        self.state.lock().await.session = Some(Session {
            expires_at,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: Some(user),
        });

        Ok(strip_redirect_params(url))
    }
}
