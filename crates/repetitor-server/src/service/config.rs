//! Service layer configuration.

#[cfg(any(test, feature = "config"))]
use clap::Args;
use repetitor_gateway::{GatewayClient, GatewayConfig};
use repetitor_search::SearchService;
use repetitor_search::firecrawl::{FirecrawlClient, FirecrawlConfig};
use serde::{Deserialize, Serialize};

use crate::service::{
    AugmentConfig, AuthKeys, AuthKeysConfig, ContextAugmenter, RateLimitConfig, RateLimiter,
};
use crate::{Error, Result};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    #[serde(default)]
    pub search: FirecrawlConfig,

    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    #[serde(default)]
    pub augment: AugmentConfig,

    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    #[serde(default)]
    pub auth: AuthKeysConfig,
}

impl ServiceConfig {
    /// Validates all configuration values.
    ///
    /// Missing gateway or search credentials are not errors: the relay
    /// answers 500 and augmentation is skipped respectively.
    pub fn validate(&self) -> Result<()> {
        self.augment.validate().map_err(Error::config)?;
        self.rate_limit.validate().map_err(Error::config)?;

        if self.gateway.model.trim().is_empty() {
            return Err(Error::config("Gateway model must not be empty"));
        }

        Ok(())
    }

    /// Creates the completion gateway client.
    pub fn connect_gateway(&self) -> Result<GatewayClient> {
        GatewayClient::new(self.gateway.clone()).map_err(|e| {
            Error::external("gateway", "Failed to create gateway client").with_source(e)
        })
    }

    /// Creates the web search service.
    pub fn connect_search(&self) -> Result<SearchService> {
        let client = FirecrawlClient::new(self.search.clone()).map_err(|e| {
            Error::external("search", "Failed to create search client").with_source(e)
        })?;
        Ok(client.into_service())
    }

    /// Creates the context augmenter over the web search service.
    pub fn create_augmenter(&self) -> Result<ContextAugmenter> {
        Ok(ContextAugmenter::new(self.connect_search()?, &self.augment))
    }

    /// Creates the rate limiter.
    pub fn create_rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.rate_limit.clone())
    }

    /// Loads the token verification keys.
    pub fn load_auth_keys(&self) -> Result<AuthKeys> {
        AuthKeys::from_config(&self.auth)
    }
}
