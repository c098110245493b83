//! Middleware configuration for the HTTP server.

use clap::Args;
use repetitor_server::middleware::{CorsConfig, RecoveryConfig};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Middleware configuration combining CORS and recovery settings.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// CORS (Cross-Origin Resource Sharing) configuration.
    #[clap(flatten)]
    #[serde(default)]
    pub cors: CorsConfig,

    /// Request timeout and panic recovery.
    #[clap(flatten)]
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

impl MiddlewareConfig {
    /// Validates middleware settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        let timeout = self.recovery.request_timeout;
        if timeout == 0 || timeout > 300 {
            anyhow::bail!(
                "Request timeout {timeout} seconds is invalid. Must be between 1 and 300 seconds."
            );
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.is_empty() {
            anyhow::bail!("CORS credentials require an explicit list of allowed origins");
        }

        Ok(())
    }

    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            origins = ?self.cors.allowed_origins,
            credentials = self.cors.allow_credentials,
            "CORS configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout,
            "Recovery configuration"
        );
    }
}
