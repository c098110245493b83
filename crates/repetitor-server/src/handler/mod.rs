//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod chat;
mod error;
mod health;
pub mod request;
mod response;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::{ErrorResponse, HealthResponse};
use crate::service::ServiceState;

/// Tracing target for error responses.
pub const TRACING_TARGET_RESPONSE: &str = "repetitor_server::handler::response";

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes and the JSON 404 fallback.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(chat::routes())
        .merge(health::routes())
        .fallback(fallback)
}
