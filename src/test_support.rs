// Shared fixtures and fakes for unit tests
use crate::application::authorization_service::AuthorizationService;
use crate::application::dashboard_platform::{DashboardPlatform, PlatformError, SecurableQuery};
use crate::application::dashboard_service::DashboardService;
use crate::client::error::{AuthError, ClientError};
use crate::client::identity::{
    strip_redirect_params, IdentityProvider, PendingLogin, TransactionStore, UserProfile,
};
use crate::client::portal_api::PortalApi;
use crate::client::surface::{PageSurface, Tab};
use crate::client::widget_host::{DashboardOptions, EmbedWidget};
use crate::domain::auth_config::PublicAuthConfig;
use crate::domain::authorization::{AuthorizationRequest, DashboardAuthorization};
use crate::domain::dashboard::{DashboardSummary, LocalizedName, Securable, SecurableTag};
use crate::infrastructure::jwks::{JwksCache, JwksError, KeySetSource, TokenVerifier};
use crate::presentation::app_state::AppState;
use crate::presentation::routes::{app_router, StaticAssets};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_KID: &str = "test-key";
pub const TEST_ISSUER: &str = "https://tenant.example.com/";
pub const TEST_AUDIENCE: &str = "https://portal.example.com/api";
pub const TEST_NAMESPACE: &str = "https://myexampleapp/";

const TEST_MODULUS: &str = "ocl9kZKDU8VfrAvInzoFrhRzM6QTaj3dCm2z37B5TXgY4Dcw8M7Wrb1a7mLSMccQs2Ir9BstK578VhrMd36V4r3lrXaWLufmYeIQMY7U9sBdOsEZgdFEg27K5ATmX-4xgnXeifnH6EPinqEAEMZtVxBJChmZtcAZBfaxgR0DUbIW6T3BWi8Sv-Czm8WGEbXXuJeexc6sL2JkwmCy8s9CPVhIQz52lGOGRKvZcV-9_7DVgqhWnfh0e55AIfXjOyg1_FhoT_0Jx8-OQYG6A18qho7RXpBXrTA1bDYVuIItQ88Rirk_AHDS-5S_zZrnnxWo0XcjeQaXC2ZO26MF2ngo9w";
const SIGNING_KEY_PEM: &str = include_str!("../fixtures/test_signing_key.pem");

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn test_jwk_set() -> JwkSet {
    serde_json::from_value(json!({
        "keys": [{
            "kty": "RSA",
            "kid": TEST_KID,
            "use": "sig",
            "alg": "RS256",
            "n": TEST_MODULUS,
            "e": "AQAB"
        }]
    }))
    .expect("test key set is valid")
}

/// Standard claims for a valid token, with `overrides` merged on top
pub fn token_claims(overrides: Value) -> Value {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "sub": "auth0|jane",
        "iss": TEST_ISSUER,
        "aud": TEST_AUDIENCE,
        "iat": now,
        "exp": now + 3600,
    });
    if let (Some(target), Value::Object(extra)) = (claims.as_object_mut(), overrides) {
        target.extend(extra);
    }
    claims
}

pub fn sign_token(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes()).expect("test key parses");
    encode(&header, claims, &key).expect("token encodes")
}

pub fn valid_token() -> String {
    sign_token(
        &token_claims(json!({
            "https://myexampleapp/firstName": "Jane",
            "https://myexampleapp/parameters": {"department": ["Sales"]}
        })),
        Some(TEST_KID),
    )
}

pub struct StaticKeySource {
    keys: JwkSet,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.keys.clone())
    }
}

pub fn test_verifier() -> TokenVerifier {
    let source = Arc::new(StaticKeySource::new(test_jwk_set()));
    TokenVerifier::new(JwksCache::new(source, 5), TEST_ISSUER, TEST_AUDIENCE)
}

// ---------------------------------------------------------------------------
// Dashboard platform
// ---------------------------------------------------------------------------

pub fn securable(id: &str, kind: &str, name_en: &str, tags: &[&str]) -> Securable {
    let mut name = LocalizedName::new();
    name.insert("en".to_string(), name_en.to_string());
    Securable {
        id: id.to_string(),
        kind: Some(kind.to_string()),
        name,
        tags: tags
            .iter()
            .map(|tag| SecurableTag {
                id: None,
                tag: tag.to_string(),
            })
            .collect(),
    }
}

/// d1 and d2 are tagged dashboards; d3 lacks the tag; ds1 is a tagged dataset
pub fn sample_securables() -> Vec<Securable> {
    vec![
        securable("d1", "dashboard", "Sales", &["auth0"]),
        securable("d2", "dashboard", "Ops", &["finance", "auth0"]),
        securable("d3", "dashboard", "Internal", &["internal"]),
        securable("ds1", "dataset", "Orders", &["auth0"]),
    ]
}

/// Returns every securable regardless of tag, like an upstream that ignores the join
pub struct FakePlatform {
    securables: Vec<Securable>,
    find_failures: Mutex<VecDeque<PlatformError>>,
    mint_failure: Mutex<Option<PlatformError>>,
    find_calls: AtomicUsize,
    mint_calls: AtomicUsize,
    requests: Mutex<Vec<AuthorizationRequest>>,
}

impl FakePlatform {
    pub fn new(securables: Vec<Securable>) -> Self {
        Self {
            securables,
            find_failures: Mutex::new(VecDeque::new()),
            mint_failure: Mutex::new(None),
            find_calls: AtomicUsize::new(0),
            mint_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next_find(&self, err: PlatformError) {
        self.find_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_mint(&self, err: PlatformError) {
        *self.mint_failure.lock().unwrap() = Some(err);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn mint_calls(&self) -> usize {
        self.mint_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AuthorizationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DashboardPlatform for FakePlatform {
    async fn find_securables(&self, query: &SecurableQuery) -> Result<Vec<Securable>, PlatformError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.find_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(self
            .securables
            .iter()
            .filter(|s| query.id.as_deref().is_none_or(|id| s.id == id))
            .cloned()
            .collect())
    }

    async fn create_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<DashboardAuthorization, PlatformError> {
        self.mint_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.mint_failure.lock().unwrap().take() {
            return Err(err);
        }

        self.requests.lock().unwrap().push(request.clone());
        Ok(DashboardAuthorization {
            id: Uuid::new_v4().to_string(),
            token: Uuid::new_v4().to_string(),
        })
    }
}

pub fn test_state(platform: Arc<FakePlatform>) -> Arc<AppState> {
    let dashboard_service = DashboardService::new(platform.clone(), "auth0".to_string(), 1);
    let authorization_service =
        AuthorizationService::new(platform, dashboard_service.clone(), TEST_NAMESPACE.to_string());

    Arc::new(AppState {
        dashboard_service,
        authorization_service,
        verifier: test_verifier(),
        public_auth_config: PublicAuthConfig {
            domain: "tenant.example.com".to_string(),
            client_id: "client-123".to_string(),
            audience: TEST_AUDIENCE.to_string(),
        },
    })
}

/// Serves the full router on a local port, for clients that need a real portal
pub async fn serve_portal() -> (Url, Arc<FakePlatform>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let index_file = dir.path().join("index.html");
    std::fs::write(&index_file, "<html></html>").unwrap();

    let platform = Arc::new(FakePlatform::new(sample_securables()));
    let router = app_router(
        test_state(platform.clone()),
        &StaticAssets {
            public_dir: dir.path().join("public"),
            index_file,
        },
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let base = Url::parse(&format!("http://{}/", addr)).unwrap();
    (base, platform, dir)
}

// ---------------------------------------------------------------------------
// Page client collaborators
// ---------------------------------------------------------------------------

pub fn summary(id: &str, name_en: &str) -> DashboardSummary {
    let mut name = LocalizedName::new();
    name.insert("en".to_string(), name_en.to_string());
    DashboardSummary::new(id.to_string(), name)
}

pub struct FakeIdentity {
    authenticated: AtomicBool,
    token: Mutex<Result<String, AuthError>>,
    user: Option<UserProfile>,
    callbacks: AtomicUsize,
    logins: AtomicUsize,
}

impl FakeIdentity {
    pub fn signed_in(user: UserProfile) -> Self {
        Self {
            authenticated: AtomicBool::new(true),
            token: Mutex::new(Ok("bearer-token".to_string())),
            user: Some(user),
            callbacks: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            token: Mutex::new(Err(AuthError::LoginRequired)),
            user: None,
            callbacks: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
        }
    }

    /// Signed out, but completing the callback yields a session for `user`
    pub fn awaiting_callback(user: UserProfile) -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            token: Mutex::new(Ok("bearer-token".to_string())),
            user: Some(user),
            callbacks: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
        }
    }

    /// Hands out `token` from now on, whether or not the portal accepts it
    pub fn use_token(&self, token: &str) {
        *self.token.lock().unwrap() = Ok(token.to_string());
    }

    pub fn expire_refresh(&self) {
        *self.token.lock().unwrap() = Err(AuthError::LoginRequired);
    }

    pub fn callbacks(&self) -> usize {
        self.callbacks.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn login(&self) -> Url {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Url::parse("https://tenant.example.com/authorize?client_id=client-123").unwrap()
    }

    async fn logout(&self) -> Url {
        self.authenticated.store(false, Ordering::SeqCst);
        Url::parse("https://tenant.example.com/v2/logout").unwrap()
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn get_user(&self) -> Option<UserProfile> {
        if self.authenticated.load(Ordering::SeqCst) {
            self.user.clone()
        } else {
            None
        }
    }

    async fn get_token_silently(&self) -> Result<String, AuthError> {
        self.token.lock().unwrap().clone()
    }

    async fn handle_redirect_callback(&self, url: &Url) -> Result<Url, AuthError> {
        self.callbacks.fetch_add(1, Ordering::SeqCst);
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(strip_redirect_params(url))
    }
}

/// Browser session storage stand-in: entries survive only as serialized strings
#[derive(Default)]
pub struct SessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStorage {
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl TransactionStore for SessionStorage {
    async fn save(&self, state: String, login: PendingLogin) {
        let raw = serde_json::to_string(&login).unwrap();
        self.entries.lock().unwrap().insert(state, raw);
    }

    async fn take(&self, state: &str) -> Option<PendingLogin> {
        let raw = self.entries.lock().unwrap().remove(state)?;
        serde_json::from_str(&raw).ok()
    }

    async fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[derive(Default)]
pub struct FakePortalApi {
    dashboards: Vec<DashboardSummary>,
    failing: Mutex<HashSet<String>>,
    authorize_calls: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    minted: AtomicUsize,
}

impl FakePortalApi {
    pub fn new(dashboards: Vec<DashboardSummary>) -> Self {
        Self {
            dashboards,
            ..Self::default()
        }
    }

    pub fn fail_authorization_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn allow_authorization_for(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn authorize_calls(&self) -> Vec<String> {
        self.authorize_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalApi for FakePortalApi {
    async fn list_dashboards(&self, _bearer: &str) -> Result<Vec<DashboardSummary>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.dashboards.clone())
    }

    async fn authorize_dashboard(
        &self,
        _bearer: &str,
        dashboard_id: &str,
    ) -> Result<DashboardAuthorization, ClientError> {
        self.authorize_calls.lock().unwrap().push(dashboard_id.to_string());
        if self.failing.lock().unwrap().contains(dashboard_id) {
            return Err(ClientError::Status {
                status: 502,
                message: "Dashboard platform request failed".to_string(),
            });
        }

        let n = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(DashboardAuthorization {
            id: format!("key-{}", n),
            token: format!("token-{}", n),
        })
    }
}

#[derive(Debug, Default)]
pub struct RecordingWidget {
    pub added: Vec<DashboardOptions>,
    pub removed: Vec<String>,
}

impl EmbedWidget for RecordingWidget {
    fn add_dashboard(&mut self, options: &DashboardOptions) {
        self.added.push(options.clone());
    }

    fn remove_dashboard(&mut self, container: &str) {
        self.removed.push(container.to_string());
    }
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub tabs: Vec<Tab>,
    pub active_tab: Option<String>,
    pub hidden: HashMap<String, bool>,
    pub user_name: Option<String>,
    pub picture: Option<String>,
    pub active_language: Option<String>,
    pub gated_revealed: bool,
    pub menu_open: bool,
    pub errors: Vec<String>,
    pub navigations: Vec<Url>,
    pub replaced: Vec<Url>,
}

impl RecordingSurface {
    pub fn is_hidden(&self, container: &str) -> bool {
        self.hidden.get(container).copied().unwrap_or(false)
    }

    pub fn visible_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str).filter(|e| !e.is_empty())
    }
}

impl PageSurface for RecordingSurface {
    fn render_tabs(&mut self, tabs: &[Tab]) {
        self.tabs = tabs.to_vec();
    }

    fn set_active_tab(&mut self, dashboard_id: &str) {
        self.active_tab = Some(dashboard_id.to_string());
    }

    fn set_container_hidden(&mut self, container: &str, hidden: bool) {
        self.hidden.insert(container.to_string(), hidden);
    }

    fn set_user_details(&mut self, name: Option<&str>, picture: Option<&str>) {
        self.user_name = name.map(str::to_string);
        self.picture = picture.map(str::to_string);
    }

    fn set_active_language(&mut self, language: &str) {
        self.active_language = Some(language.to_string());
    }

    fn reveal_gated_content(&mut self) {
        self.gated_revealed = true;
    }

    fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn clear_error(&mut self) {
        self.errors.push(String::new());
    }

    fn navigate(&mut self, url: &Url) {
        self.navigations.push(url.clone());
    }

    fn replace_address(&mut self, url: &Url) {
        self.replaced.push(url.clone());
    }
}
