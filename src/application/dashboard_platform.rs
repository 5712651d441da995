// Port to the dashboard platform's management API
use crate::domain::authorization::{AuthorizationRequest, DashboardAuthorization};
use crate::domain::dashboard::Securable;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("platform rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected platform response: {0}")]
    Decode(String),
}

/// Filter for a securable listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurableQuery {
    pub kind: String,
    pub tag: String,
    pub id: Option<String>,
}

impl SecurableQuery {
    pub fn dashboards_tagged(tag: &str) -> Self {
        Self {
            kind: "dashboard".to_string(),
            tag: tag.to_string(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

#[async_trait]
pub trait DashboardPlatform: Send + Sync {
    /// Securables matching the query, each with its tags joined in
    async fn find_securables(&self, query: &SecurableQuery) -> Result<Vec<Securable>, PlatformError>;

    /// Mint a temporary authorization. Not idempotent: callers must not retry.
    async fn create_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<DashboardAuthorization, PlatformError>;
}
