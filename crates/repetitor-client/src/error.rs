//! Error types for the relay client.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result type alias for relay client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fallback reason when a rejection carries no readable body.
const DEFAULT_REASON: &str = "Произошла ошибка";

/// Error body produced by the relay.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Error type for relay client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The relay answered 429.
    #[error("relay rate limit exceeded")]
    RateLimited,
    /// The relay answered 401.
    #[error("relay rejected the credentials")]
    Unauthorized,
    /// The relay answered 400.
    #[error("relay rejected the request: {0}")]
    InvalidRequest(String),
    /// The relay answered with any other non-success status.
    #[error("relay unavailable ({status}): {reason}")]
    ServiceUnavailable { status: StatusCode, reason: String },
    /// HTTP transport failed before the stream opened.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The event stream failed after it opened.
    #[error("stream error: {0}")]
    Stream(#[from] repetitor_gateway::Error),
}

impl Error {
    /// Maps a non-success relay response onto an error.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let reason = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.error)
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_owned());

        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::BAD_REQUEST => Self::InvalidRequest(reason),
            status => Self::ServiceUnavailable { status, reason },
        }
    }

    /// Returns the notice shown to the learner.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => {
                "Слишком много запросов. Подождите немного и попробуйте снова.".to_owned()
            }
            Self::Unauthorized => "Сессия истекла. Войдите снова.".to_owned(),
            Self::InvalidRequest(reason) => reason.clone(),
            Self::ServiceUnavailable { reason, .. } => reason.clone(),
            Self::Reqwest(_) => {
                "Ошибка подключения. Проверьте интернет и попробуйте снова.".to_owned()
            }
            Self::Stream(_) => "Ответ прервался. Попробуйте снова.".to_owned(),
        }
    }
}
