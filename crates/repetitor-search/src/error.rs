//! Error types for search operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for search operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No API key is configured for the provider.
    #[error("search credentials are not configured")]
    MissingCredentials,
    /// The provider answered with a non-success status.
    #[error("search provider returned status {0}")]
    Status(StatusCode),
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Provider-specific failure.
    #[error("search provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Creates a provider-specific error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}
