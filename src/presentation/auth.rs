// Bearer token middleware for the protected routes
use crate::error::PortalError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Rejects the request with 401 unless it carries a valid bearer token.
/// On success the token's `UserClaims` are placed in the request extensions.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!(uri = %request.uri(), "Missing bearer token");
        return Err(PortalError::Unauthorized);
    };

    match state.verifier.verify(&token).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(err) => {
            tracing::warn!(error = %err, uri = %request.uri(), "Rejected bearer token");
            Err(PortalError::Unauthorized)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}
