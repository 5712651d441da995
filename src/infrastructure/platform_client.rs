// Dashboard platform (Cumul.io style) HTTP adapter
use crate::application::dashboard_platform::{DashboardPlatform, PlatformError, SecurableQuery};
use crate::domain::authorization::{AuthorizationRequest, DashboardAuthorization};
use crate::domain::dashboard::Securable;
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_VERSION: &str = "0.1.0";

#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct SecurableRows {
    #[serde(default)]
    rows: Vec<Securable>,
}

#[derive(Debug, Deserialize)]
struct PlatformErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<PlatformErrorType>,
}

#[derive(Debug, Deserialize)]
struct PlatformErrorType {
    #[serde(default)]
    description: Option<String>,
}

impl HttpPlatformClient {
    pub fn new(
        api_url: String,
        api_key: String,
        api_token: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build dashboard platform HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            api_token,
        })
    }

    fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}/{}", self.api_url, API_VERSION, resource)
    }

    /// Every platform call is a POST of `{action, version, key, token, <field>: payload}`
    async fn execute<T: DeserializeOwned>(
        &self,
        resource: &str,
        action: &str,
        field: &str,
        payload: Value,
    ) -> Result<T, PlatformError> {
        let mut body = json!({
            "action": action,
            "version": API_VERSION,
            "key": self.api_key,
            "token": self.api_token,
        });
        body[field] = payload;

        let response = self
            .client
            .post(self.resource_url(resource))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PlatformError::Rejected {
                status: status.as_u16(),
                message: describe_error_body(&text),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                PlatformError::Timeout
            } else {
                PlatformError::Decode(e.to_string())
            }
        })
    }
}

fn transport_error(err: reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Timeout
    } else {
        PlatformError::Transport(err.to_string())
    }
}

fn describe_error_body(text: &str) -> String {
    let parsed = serde_json::from_str::<PlatformErrorBody>(text).ok();
    let description = parsed.and_then(|body| {
        body.message
            .or_else(|| body.kind.and_then(|kind| kind.description))
    });

    match description {
        Some(description) => description,
        None if text.trim().is_empty() => "empty response body".to_string(),
        None => text.chars().take(200).collect(),
    }
}

/// `find` clause: securables of one type, inner-joined with the membership tag
pub fn securable_find_clause(query: &SecurableQuery) -> Value {
    let mut where_clause = json!({ "type": query.kind });
    if let Some(id) = &query.id {
        where_clause["id"] = json!(id);
    }

    json!({
        "where": where_clause,
        "attributes": ["id", "name", "type"],
        "include": [{
            "model": "Tag",
            "where": { "tag": query.tag },
            "attributes": ["id", "tag"],
            "jointype": "inner"
        }],
        "order": [["name", "asc"]]
    })
}

/// `properties` of a temporary authorization
pub fn authorization_properties(request: &AuthorizationRequest) -> Value {
    let mut properties = json!({
        "type": "temporary",
        "securables": [request.dashboard_id],
        "expiry": request.policy.expiry_interval(),
        "inactivity_interval": request.policy.inactivity_interval(),
        "metadata": Value::Object(request.metadata.clone()),
    });

    if let Some(username) = &request.username {
        properties["username"] = json!(username);
    }
    if let Some(name) = &request.name {
        properties["name"] = json!(name);
    }
    if let Some(email) = &request.email {
        properties["email"] = json!(email);
    }

    properties
}

#[async_trait]
impl DashboardPlatform for HttpPlatformClient {
    async fn find_securables(&self, query: &SecurableQuery) -> Result<Vec<Securable>, PlatformError> {
        let find = securable_find_clause(query);
        tracing::debug!(tag = %query.tag, id = ?query.id, "Querying platform securables");

        let result: SecurableRows = self.execute("securable", "get", "find", find).await?;
        Ok(result.rows)
    }

    async fn create_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<DashboardAuthorization, PlatformError> {
        let properties = authorization_properties(request);
        self.execute("authorization", "create", "properties", properties)
            .await
    }
}
