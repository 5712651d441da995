// Dashboard service - Use case for listing the dashboards tagged for this app
use crate::application::dashboard_platform::{DashboardPlatform, PlatformError, SecurableQuery};
use crate::domain::dashboard::{DashboardSummary, Securable};
use crate::error::{PortalError, PortalResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    platform: Arc<dyn DashboardPlatform>,
    tag: String,
    list_retries: u32,
}

impl DashboardService {
    pub fn new(platform: Arc<dyn DashboardPlatform>, tag: String, list_retries: u32) -> Self {
        Self {
            platform,
            tag,
            list_retries,
        }
    }

    /// All dashboards carrying the membership tag, in platform order
    pub async fn list_dashboards(&self) -> PortalResult<Vec<DashboardSummary>> {
        let query = SecurableQuery::dashboards_tagged(&self.tag);
        let rows = self.find_with_retry(&query).await?;
        Ok(self.retain_tagged(rows))
    }

    /// Looks up one tagged dashboard; untagged or unknown ids are `NotFound`
    pub async fn find_dashboard(&self, id: &str) -> PortalResult<DashboardSummary> {
        let query = SecurableQuery::dashboards_tagged(&self.tag).with_id(id);
        let rows = self.find_with_retry(&query).await?;
        self.retain_tagged(rows)
            .into_iter()
            .find(|dashboard| dashboard.id == id)
            .ok_or_else(|| PortalError::NotFound(id.to_string()))
    }

    // Listing is a read, so timeouts are retried a bounded number of times
    async fn find_with_retry(&self, query: &SecurableQuery) -> Result<Vec<Securable>, PlatformError> {
        let mut attempt = 0;
        loop {
            match self.platform.find_securables(query).await {
                Err(PlatformError::Timeout) if attempt < self.list_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, tag = %self.tag, "Dashboard listing timed out, retrying");
                }
                result => return result,
            }
        }
    }

    fn retain_tagged(&self, rows: Vec<Securable>) -> Vec<DashboardSummary> {
        rows.into_iter()
            .filter(|row| row.is_dashboard() && row.has_tag(&self.tag))
            .map(Securable::into_summary)
            .collect()
    }
}
