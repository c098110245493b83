//! Error types for the completion gateway.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for gateway operations.
///
/// Upstream response bodies are never carried by these variants; they are
/// logged at the point of failure and dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// No API key is configured for the gateway.
    #[error("gateway credentials are not configured")]
    MissingCredentials,
    /// The gateway answered 429.
    #[error("gateway rate limit exceeded")]
    RateLimited,
    /// The gateway answered 402.
    #[error("gateway account requires payment")]
    PaymentRequired,
    /// The gateway answered with any other non-success status.
    #[error("gateway returned status {0}")]
    Status(StatusCode),
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// No response headers or no body bytes within the allowed time.
    #[error("gateway did not respond within {0:?}")]
    Timeout(Duration),
    /// The event stream carried an error event.
    #[error("gateway stream failed: {0}")]
    Stream(String),
}

impl Error {
    /// Maps a non-success upstream status onto an error.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::PAYMENT_REQUIRED => Self::PaymentRequired,
            status => Self::Status(status),
        }
    }
}
