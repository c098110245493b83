//! Application state and dependency injection.

mod augment;
mod config;
pub mod prompt;
pub mod sanitize;
mod security;

use repetitor_gateway::GatewayClient;

pub use crate::service::augment::{AugmentConfig, ContextAugmenter, SearchTriggers};
pub use crate::service::config::ServiceConfig;
pub use crate::service::security::{
    AuthKeys, AuthKeysConfig, RateLimitConfig, RateLimitKey, RateLimiter,
};
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    // External services:
    pub gateway: GatewayClient,
    pub augmenter: ContextAugmenter,

    // Internal services:
    pub rate_limiter: RateLimiter,
    pub auth_keys: AuthKeys,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Builds the outbound clients, loads the token keys and starts the
    /// rate limiter's cleanup task. Must be called within a Tokio runtime.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let service_state = Self {
            gateway: config.connect_gateway()?,
            augmenter: config.create_augmenter()?,

            rate_limiter: config.create_rate_limiter(),
            auth_keys: config.load_auth_keys()?,
        };

        let _cleanup = service_state.rate_limiter.spawn_cleanup_task();
        Ok(service_state)
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(gateway: GatewayClient);
impl_di!(augmenter: ContextAugmenter);

// Internal services:
impl_di!(rate_limiter: RateLimiter);
impl_di!(auth_keys: AuthKeys);
