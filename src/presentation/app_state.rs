// Application state for HTTP handlers
use crate::application::authorization_service::AuthorizationService;
use crate::application::dashboard_service::DashboardService;
use crate::domain::auth_config::PublicAuthConfig;
use crate::infrastructure::jwks::TokenVerifier;

pub struct AppState {
    pub dashboard_service: DashboardService,
    pub authorization_service: AuthorizationService,
    pub verifier: TokenVerifier,
    pub public_auth_config: PublicAuthConfig,
}
