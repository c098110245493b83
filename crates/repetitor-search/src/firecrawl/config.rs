//! Firecrawl client configuration.

use std::fmt;
use std::time::Duration;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.firecrawl.dev/v1/search";

/// Default timeout for HTTP requests: 10 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the Firecrawl search client.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
pub struct FirecrawlConfig {
    /// Search API endpoint
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            id = "firecrawl_endpoint",
            long = "firecrawl-url",
            env = "FIRECRAWL_API_URL",
            default_value = "https://api.firecrawl.dev/v1/search"
        )
    )]
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Search API key; web search is skipped when unset
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            id = "firecrawl_api_key",
            long = "firecrawl-api-key",
            env = "FIRECRAWL_API_KEY",
            hide_env_values = true
        )
    )]
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            id = "firecrawl_timeout_secs",
            long = "firecrawl-timeout",
            env = "FIRECRAWL_TIMEOUT",
            default_value = "10"
        )
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default search endpoint is a valid URL")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for FirecrawlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirecrawlConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FirecrawlConfig {
    /// Returns `true` if a non-empty API key is present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }

    /// Returns the effective timeout, using the default if zero.
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
