// Authorization service - Use case for minting per-user dashboard tokens
use crate::application::dashboard_platform::DashboardPlatform;
use crate::application::dashboard_service::DashboardService;
use crate::domain::authorization::{AuthorizationRequest, DashboardAuthorization, ExpiryPolicy};
use crate::domain::claims::UserClaims;
use crate::error::{PortalError, PortalResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthorizationService {
    platform: Arc<dyn DashboardPlatform>,
    dashboards: DashboardService,
    namespace: String,
    policy: ExpiryPolicy,
}

impl AuthorizationService {
    pub fn new(
        platform: Arc<dyn DashboardPlatform>,
        dashboards: DashboardService,
        namespace: String,
    ) -> Self {
        Self {
            platform,
            dashboards,
            namespace,
            policy: ExpiryPolicy::default(),
        }
    }

    pub async fn authorize(
        &self,
        claims: &UserClaims,
        dashboard_id: &str,
    ) -> PortalResult<DashboardAuthorization> {
        let dashboard_id = dashboard_id.trim();
        if dashboard_id.is_empty() {
            return Err(PortalError::BadRequest("Missing dashboard id".to_string()));
        }

        self.dashboards.find_dashboard(dashboard_id).await?;

        let request = build_authorization_request(claims, dashboard_id, &self.namespace, self.policy);
        tracing::debug!(
            dashboard_id,
            username = ?request.username,
            filters = request.metadata.len(),
            "Creating temporary dashboard authorization"
        );

        let authorization = self.platform.create_authorization(&request).await?;
        if authorization.id.is_empty() || authorization.token.is_empty() {
            return Err(PortalError::Upstream(
                "platform returned an empty authorization".to_string(),
            ));
        }

        Ok(authorization)
    }
}

/// Maps the caller's claims onto a temporary authorization for one dashboard
pub fn build_authorization_request(
    claims: &UserClaims,
    dashboard_id: &str,
    namespace: &str,
    policy: ExpiryPolicy,
) -> AuthorizationRequest {
    let name = claims
        .namespaced_str(namespace, "firstName")
        .or_else(|| claims.claim_str("name"));
    let email = claims
        .namespaced_str(namespace, "email")
        .or_else(|| claims.claim_str("email"));

    AuthorizationRequest {
        dashboard_id: dashboard_id.to_string(),
        policy,
        username: (!claims.sub.is_empty()).then(|| claims.sub.clone()),
        name: name.map(str::to_string),
        email: email.map(str::to_string),
        metadata: claims.attribute_filters(namespace),
    }
}
