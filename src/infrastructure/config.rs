use crate::domain::auth_config::PublicAuthConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub platform: PlatformSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_dir: default_public_dir(),
            index_file: default_index_file(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub domain: String,
    pub client_id: String,
    pub audience: String,
    /// Prefix of the custom claims the identity provider adds to tokens
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_jwks_requests_per_minute")]
    pub jwks_requests_per_minute: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AuthSettings {
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_uri(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn public_config(&self) -> PublicAuthConfig {
        PublicAuthConfig {
            domain: self.domain.clone(),
            client_id: self.client_id.clone(),
            audience: self.audience.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub api_key: String,
    pub api_token: String,
    #[serde(default = "default_dashboard_tag")]
    pub dashboard_tag: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_list_retries")]
    pub list_retries: u32,
}

impl PlatformSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_namespace() -> String {
    "https://myexampleapp/".to_string()
}

fn default_jwks_requests_per_minute() -> u32 {
    5
}

fn default_api_url() -> String {
    "https://api.cumul.io".to_string()
}

fn default_dashboard_tag() -> String {
    "auth0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_list_retries() -> u32 {
    2
}

/// Loads `config/portal.*`, overridden by `PORTAL__SECTION__KEY` environment variables
pub fn load_portal_config() -> anyhow::Result<PortalConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/portal").required(false))
        .add_source(
            config::Environment::with_prefix("PORTAL")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
