use std::time::Duration;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Context augmentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct AugmentConfig {
    /// Time budget in milliseconds for one web search.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "SEARCH_TIMEOUT_MS", default_value = "5000")
    )]
    #[serde(default = "AugmentConfig::default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Maximum number of search results folded into the prompt.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "SEARCH_RESULT_LIMIT", default_value = "3")
    )]
    #[serde(default = "AugmentConfig::default_search_result_limit")]
    pub search_result_limit: usize,
}

impl AugmentConfig {
    fn default_search_timeout_ms() -> u64 {
        5000
    }

    fn default_search_result_limit() -> usize {
        3
    }

    /// Returns the search time budget.
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.search_timeout_ms == 0 {
            return Err("Search timeout must be greater than zero".to_owned());
        }

        if !(1..=10).contains(&self.search_result_limit) {
            return Err("Search result limit must be between 1 and 10".to_owned());
        }

        Ok(())
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            search_timeout_ms: Self::default_search_timeout_ms(),
            search_result_limit: Self::default_search_result_limit(),
        }
    }
}
