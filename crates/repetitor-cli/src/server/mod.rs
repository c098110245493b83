//! HTTP server startup, lifecycle and graceful shutdown.

mod http_server;
mod lifecycle;
mod shutdown;

use std::io;

use axum::Router;
pub use http_server::serve_http;

use crate::config::ServerConfig;

/// Starts the HTTP server and runs it until a shutdown signal is handled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
/// while running.
pub async fn serve(app: Router, config: ServerConfig) -> io::Result<()> {
    serve_http(app, config).await
}
