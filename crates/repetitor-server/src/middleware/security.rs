//! Security middleware: CORS and request body size limits.

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::{self, HeaderValue};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

/// Maximum request body size: 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Extension trait for `axum::`[`Router`] to apply security middleware.
pub trait RouterSecurityExt<S> {
    /// Layers CORS and body limit middleware with the provided configuration.
    fn with_security(self, cors: &CorsConfig) -> Self;

    /// Layers security middleware with the default configuration.
    fn with_default_security(self) -> Self;
}

impl<S> RouterSecurityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, cors: &CorsConfig) -> Self {
        self.layer(DefaultBodyLimit::max(DEFAULT_MAX_BODY_SIZE))
            .layer(RequestBodyLimitLayer::new(DEFAULT_MAX_BODY_SIZE))
            .layer(cors.to_layer())
    }

    fn with_default_security(self) -> Self {
        self.with_security(&CorsConfig::default())
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct CorsConfig {
    /// List of allowed CORS origins.
    ///
    /// If empty, any origin is allowed and credentials are never allowed.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CORS_ORIGINS", value_delimiter = ',')
    )]
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Maximum age for CORS preflight requests in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CORS_MAX_AGE", default_value = "3600")
    )]
    #[serde(default = "CorsConfig::default_max_age_seconds")]
    pub max_age_seconds: u64,

    /// Whether to allow credentials for the listed origins.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CORS_ALLOW_CREDENTIALS", default_value = "false")
    )]
    #[serde(default)]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: Self::default_max_age_seconds(),
            allow_credentials: false,
        }
    }
}

impl CorsConfig {
    fn default_max_age_seconds() -> u64 {
        3600
    }

    /// Returns the CORS max age as a Duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    /// Converts configured origins to header values, skipping invalid ones.
    pub fn to_header_values(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| origin.parse().ok())
            .collect()
    }

    /// Builds the CORS layer.
    pub fn to_layer(&self) -> CorsLayer {
        let origins = self.to_header_values();

        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-client-info"),
                header::HeaderName::from_static("apikey"),
            ])
            .max_age(self.max_age());

        if origins.is_empty() {
            layer.allow_origin(AllowOrigin::any())
        } else {
            layer
                .allow_origin(origins)
                .allow_credentials(self.allow_credentials)
        }
    }
}
