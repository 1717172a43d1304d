use std::sync::Arc;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Statuses that indicate a transient server or gateway failure and are worth retrying.
const RETRYABLE_STATUSES: [u16; 8] = [408, 500, 502, 503, 504, 522, 524, 599];

/// Enum representing possible errors that can occur in the SDK.
///
/// Only [`Error::InvalidSecretKey`], [`Error::InvalidBaseUrl`] (at construction) and
/// [`Error::MissingUserId`] (at evaluation) are ever returned to callers of [`Client`]. The rest
/// are handled internally and only show up in logs.
///
/// [`Client`]: crate::Client
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Server secret keys start with `secret-`. The client is unusable until this is corrected.
    #[error("invalid secret key, server secret keys start with \"secret-\"")]
    InvalidSecretKey,

    /// Invalid API base URL configuration.
    #[error("invalid api_base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The user has no `user_id`. No evaluation is performed and no exposure is logged.
    #[error("a non-empty user_id is required")]
    MissingUserId,

    /// The request was rejected, the secret key is likely revoked or belongs to another project.
    #[error("unauthorized, secret key is likely invalid")]
    Unauthorized,

    /// Server responded with a non-success status.
    #[error("unexpected http response status: {0}")]
    HttpStatus(u16),

    /// Network error.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),

    /// Server responded with a payload that could not be decoded.
    #[error("malformed response from server")]
    MalformedResponse(#[source] Arc<serde_json::Error>),

    /// An I/O error.
    #[error(transparent)]
    Io(Arc<std::io::Error>),

    /// A background thread panicked. This should normally never happen.
    #[error("background thread panicked")]
    PollerThreadPanicked,
}

impl Error {
    /// Return `true` if the failure is transient and the request may succeed when retried.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            Error::HttpStatus(status) => RETRYABLE_STATUSES.contains(status),
            Error::Network(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::MalformedResponse(Arc::new(value))
    }
}
