// Router assembly: public config, protected proxy routes, static shell
use crate::infrastructure::config::ServerSettings;
use crate::presentation::app_state::AppState;
use crate::presentation::auth::require_bearer;
use crate::presentation::handlers::{auth_config, authorize_dashboard, health_check, list_dashboards};
use axum::{middleware, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Where the page shell and its assets live on disk
#[derive(Debug, Clone)]
pub struct StaticAssets {
    pub public_dir: PathBuf,
    pub index_file: PathBuf,
}

impl From<&ServerSettings> for StaticAssets {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            public_dir: settings.public_dir.clone(),
            index_file: settings.index_file.clone(),
        }
    }
}

pub fn app_router(state: Arc<AppState>, assets: &StaticAssets) -> Router {
    let protected = Router::new()
        .route("/dashboards", get(list_dashboards))
        .route("/authorization", get(authorize_dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    // Unknown paths fall through to the index page (single-page app)
    let static_files =
        ServeDir::new(&assets.public_dir).fallback(ServeFile::new(&assets.index_file));

    Router::new()
        .route("/healthz", get(health_check))
        .route("/auth_config.json", get(auth_config))
        .merge(protected)
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
