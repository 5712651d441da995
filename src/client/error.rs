use thiserror::Error;

/// Identity failures; every one of them ends in a fresh login
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("login required")]
    LoginRequired,

    #[error("no login is pending for state {0:?}")]
    InvalidState(String),

    #[error("callback URL carries no authorization code")]
    MissingCallbackParams,

    #[error("identity provider error: {0}")]
    Provider(String),

    #[error("bearer token rejected: {0}")]
    TokenRejected(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("portal responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
