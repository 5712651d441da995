// Bearer token verification against the identity provider's JWKS (RS256 only)
use crate::domain::claims::UserClaims;
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

const FETCH_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("malformed token header: {0}")]
    MalformedHeader(String),

    #[error("token algorithm {0:?} is not accepted")]
    UnsupportedAlgorithm(Algorithm),

    #[error("no signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("signing key refresh is rate limited")]
    RateLimited,

    #[error("failed to fetch signing keys: {0}")]
    Fetch(String),

    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, JwksError>;
}

/// Fetches `https://<domain>/.well-known/jwks.json`
pub struct HttpKeySetSource {
    client: reqwest::Client,
    uri: String,
}

impl HttpKeySetSource {
    pub fn new(uri: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build JWKS HTTP client")?;
        Ok(Self { client, uri })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        let response = self
            .client
            .get(&self.uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))
    }
}

#[derive(Default)]
struct CachedKeys {
    keys: Option<JwkSet>,
    fetches: VecDeque<Instant>,
}

impl CachedKeys {
    fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        let keys = self.keys.as_ref()?;
        match kid {
            Some(kid) => keys.find(kid),
            // Tokens without a kid are only usable against a single-key set
            None if keys.keys.len() == 1 => keys.keys.first(),
            None => None,
        }
    }
}

pub struct JwksCache {
    source: Arc<dyn KeySetSource>,
    max_fetches_per_minute: u32,
    state: RwLock<CachedKeys>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySetSource>, max_fetches_per_minute: u32) -> Self {
        Self {
            source,
            max_fetches_per_minute,
            state: RwLock::new(CachedKeys::default()),
        }
    }

    pub async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        {
            let cache = self.state.read().await;
            if let Some(jwk) = cache.find(kid) {
                return Ok(DecodingKey::from_jwk(jwk)?);
            }
        }

        let mut cache = self.state.write().await;
        // Another request may have refreshed while we waited for the lock
        if cache.find(kid).is_none() {
            self.refresh(&mut cache).await?;
        }

        match cache.find(kid) {
            Some(jwk) => Ok(DecodingKey::from_jwk(jwk)?),
            None => Err(JwksError::UnknownKey(kid.map(str::to_string))),
        }
    }

    async fn refresh(&self, cache: &mut CachedKeys) -> Result<(), JwksError> {
        let now = Instant::now();
        while cache
            .fetches
            .front()
            .is_some_and(|fetched| now.duration_since(*fetched) >= FETCH_WINDOW)
        {
            cache.fetches.pop_front();
        }

        if cache.fetches.len() >= self.max_fetches_per_minute as usize {
            tracing::warn!(limit = self.max_fetches_per_minute, "Signing key refresh rate limited");
            return Err(JwksError::RateLimited);
        }
        cache.fetches.push_back(now);

        let keys = self.source.fetch().await?;
        tracing::debug!(keys = keys.keys.len(), "Refreshed signing key set");
        cache.keys = Some(keys);
        Ok(())
    }
}

pub struct TokenVerifier {
    keys: JwksCache,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(keys: JwksCache, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self { keys, validation }
    }

    /// Checks signature, `aud`, `iss` and `exp`, returning the token's claims
    pub async fn verify(&self, token: &str) -> Result<UserClaims, JwksError> {
        let header = decode_header(token).map_err(|e| JwksError::MalformedHeader(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(JwksError::UnsupportedAlgorithm(header.alg));
        }

        let key = self.keys.decoding_key(header.kid.as_deref()).await?;
        let data = decode::<UserClaims>(token, &key, &self.validation)?;
        Ok(data.claims)
    }
}
