//! Twitter API client error types.

use std::sync::Arc;

/// Errors from the Twitter timeline client.
#[derive(Debug, thiserror::Error)]
pub enum TwitterError {
    /// One of the four OAuth values is empty.
    #[error("missing credentials: {0} not set")]
    MissingCredentials(&'static str),

    /// Authentication failed (bad or revoked tokens).
    #[error("authentication failed: invalid or revoked credentials")]
    AuthError,

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body larger than the configured limit.
    #[error("response too large: {size} bytes exceeds {max}")]
    TooLarge { size: u64, max: usize },

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TwitterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TwitterError::Timeout } else { TwitterError::Network(Arc::new(err)) }
    }
}

impl From<TwitterError> for gemfeed_core::Error {
    fn from(err: TwitterError) -> Self {
        gemfeed_core::Error::FetchFailed(err.to_string())
    }
}
