// Error taxonomy for the proxy routes, rendered as JSON responses
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::dashboard_platform::PlatformError;

pub type PortalResult<T> = Result<T, PortalError>;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Invalid token")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Dashboard not found: {0}")]
    NotFound(String),

    #[error("Dashboard platform request failed")]
    Upstream(String),

    #[error("Dashboard platform did not respond in time")]
    UpstreamTimeout,

    #[error("Internal error")]
    Internal(String),
}

impl PortalError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream_error",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlatformError> for PortalError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Timeout => Self::UpstreamTimeout,
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// JSON body of every non-success response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub msg: String,
}

impl From<&PortalError> for ErrorBody {
    fn from(err: &PortalError) -> Self {
        Self {
            error: err.kind().to_string(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::from(&self))).into_response()
    }
}
