// Page-side client for the portal's own HTTP API
use crate::client::error::{AuthError, ClientError};
use crate::domain::auth_config::PublicAuthConfig;
use crate::domain::authorization::DashboardAuthorization;
use crate::domain::dashboard::DashboardSummary;
use crate::error::ErrorBody;
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn list_dashboards(&self, bearer: &str) -> Result<Vec<DashboardSummary>, ClientError>;

    async fn authorize_dashboard(
        &self,
        bearer: &str,
        dashboard_id: &str,
    ) -> Result<DashboardAuthorization, ClientError>;
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
    list_retries: u32,
}

impl PortalClient {
    pub fn new(base_url: Url, timeout: Duration, list_retries: u32) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;
        Ok(Self {
            http,
            base_url,
            list_retries,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    /// `/auth_config.json`, needed before the identity client can be built
    pub async fn fetch_auth_config(&self) -> Result<PublicAuthConfig, ClientError> {
        let response = self
            .http
            .get(self.endpoint("auth_config.json")?)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        read_json(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, bearer: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.msg)
            .unwrap_or(text);
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::TokenRejected(message).into());
        }
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<T>().await.map_err(ClientError::from_reqwest)
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn list_dashboards(&self, bearer: &str) -> Result<Vec<DashboardSummary>, ClientError> {
        let url = self.endpoint("dashboards")?;
        let mut attempt = 0;
        loop {
            match self.get_json(url.clone(), bearer).await {
                Err(ClientError::Timeout) if attempt < self.list_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "Dashboard list request timed out, retrying");
                }
                result => return result,
            }
        }
    }

    // Minting is never retried: a timed-out request may still have issued a token
    async fn authorize_dashboard(
        &self,
        bearer: &str,
        dashboard_id: &str,
    ) -> Result<DashboardAuthorization, ClientError> {
        let mut url = self.endpoint("authorization")?;
        url.query_pairs_mut().append_pair("id", dashboard_id);
        self.get_json(url, bearer).await
    }
}
