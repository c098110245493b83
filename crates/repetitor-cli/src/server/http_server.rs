//! HTTP server startup.

use std::future::IntoFuture;
use std::io;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::lifecycle::serve_with_shutdown;
use super::shutdown::{drain_deadline, shutdown_signal};
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Starts an HTTP server with graceful shutdown.
///
/// After a shutdown signal the listener stops accepting connections and open
/// responses get the configured shutdown timeout to finish; connections still
/// open after that are dropped.
pub async fn serve_http(app: Router, server_config: ServerConfig) -> io::Result<()> {
    let server_addr = server_config.server_addr();

    let listener = match TcpListener::bind(server_addr).await {
        Ok(listener) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %server_addr,
                "Server is ready and listening for connections"
            );
            listener
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %server_addr,
                error = %err,
                "Failed to bind to address"
            );
            return Err(err);
        }
    };

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let shutdown_timeout = server_config.shutdown_timeout();
    let graceful = token.clone().cancelled_owned();
    let deadline = drain_deadline(token, shutdown_timeout);

    serve_with_shutdown(&server_config, || async move {
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .into_future();

        tokio::select! {
            result = server => result,
            () = deadline => {
                tracing::warn!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Shutdown timeout elapsed, dropping open connections"
                );
                Ok(())
            }
        }
    })
    .await
}
