// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use embedded_dashboards::application::authorization_service::AuthorizationService;
use embedded_dashboards::application::dashboard_service::DashboardService;
use embedded_dashboards::infrastructure::config::load_portal_config;
use embedded_dashboards::infrastructure::jwks::{HttpKeySetSource, JwksCache, TokenVerifier};
use embedded_dashboards::infrastructure::platform_client::HttpPlatformClient;
use embedded_dashboards::presentation::app_state::AppState;
use embedded_dashboards::presentation::routes::{app_router, StaticAssets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_portal_config().context("Failed to load portal configuration")?;

    // Create platform adapter (infrastructure layer)
    let platform = Arc::new(HttpPlatformClient::new(
        config.platform.api_url.clone(),
        config.platform.api_key.clone(),
        config.platform.api_token.clone(),
        config.platform.timeout(),
    )?);

    // Create services (application layer)
    let dashboard_service = DashboardService::new(
        platform.clone(),
        config.platform.dashboard_tag.clone(),
        config.platform.list_retries,
    );
    let authorization_service = AuthorizationService::new(
        platform,
        dashboard_service.clone(),
        config.auth.namespace.clone(),
    );

    // Bearer token verification against the provider's published keys
    let key_source = Arc::new(HttpKeySetSource::new(
        config.auth.jwks_uri(),
        config.auth.timeout(),
    )?);
    let verifier = TokenVerifier::new(
        JwksCache::new(key_source, config.auth.jwks_requests_per_minute),
        &config.auth.issuer(),
        &config.auth.audience,
    );

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        authorization_service,
        verifier,
        public_auth_config: config.auth.public_config(),
    });

    // Build router (presentation layer)
    let router = app_router(state, &StaticAssets::from(&config.server));

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_addr))?;
    tracing::info!(%addr, tag = %config.platform.dashboard_tag, "Starting embedded-dashboards portal");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
