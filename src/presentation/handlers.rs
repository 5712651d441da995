// HTTP request handlers
use crate::domain::auth_config::PublicAuthConfig;
use crate::domain::authorization::DashboardAuthorization;
use crate::domain::claims::UserClaims;
use crate::domain::dashboard::DashboardSummary;
use crate::error::PortalError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AuthorizationQuery {
    pub id: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Public identity-provider settings for the page
pub async fn auth_config(State(state): State<Arc<AppState>>) -> Json<PublicAuthConfig> {
    Json(state.public_auth_config.clone())
}

/// List the dashboards tagged for this app
pub async fn list_dashboards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DashboardSummary>>, PortalError> {
    match state.dashboard_service.list_dashboards().await {
        Ok(dashboards) => Ok(Json(dashboards)),
        Err(e) => {
            tracing::error!(error = ?e, "Error fetching dashboards");
            Err(e)
        }
    }
}

/// Mint a temporary viewing token for one dashboard, scoped to the caller
pub async fn authorize_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<UserClaims>,
    Query(query): Query<AuthorizationQuery>,
) -> Result<Json<DashboardAuthorization>, PortalError> {
    let dashboard_id = query.id.unwrap_or_default();

    match state
        .authorization_service
        .authorize(&claims, &dashboard_id)
        .await
    {
        Ok(authorization) => Ok(Json(authorization)),
        Err(e) => {
            tracing::error!(error = ?e, dashboard_id = %dashboard_id, user = %claims.sub, "Error creating dashboard authorization");
            Err(e)
        }
    }
}
