//! In-memory rate limiter implementation using a fixed window per identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::handler::{ErrorKind, Result as HandlerResult};

/// Logging target for rate limiter operations.
const TRACING_TARGET: &str = "repetitor_server::service::rate_limiter";

/// Rate limiter key type.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    /// Rate limit by authenticated identity.
    Identity(Uuid),
}

impl From<Uuid> for RateLimitKey {
    #[inline]
    fn from(identity: Uuid) -> Self {
        Self::Identity(identity)
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(id) => write!(f, "identity:{id}"),
        }
    }
}

/// Admission record for one identity.
#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    /// Requests admitted in the current window.
    count: u32,
    /// Instant after which the window restarts.
    reset_at: Instant,
}

impl WindowRecord {
    fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        now > self.reset_at
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
pub struct RateLimitConfig {
    /// Maximum requests admitted per identity within one window.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value = "15")
    )]
    #[serde(default = "RateLimitConfig::default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value = "60")
    )]
    #[serde(default = "RateLimitConfig::default_window_secs")]
    pub window_secs: u64,

    /// Interval in seconds between sweeps of expired records.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "RATE_LIMIT_CLEANUP_SECS", default_value = "300")
    )]
    #[serde(default = "RateLimitConfig::default_cleanup_secs")]
    pub cleanup_secs: u64,
}

impl RateLimitConfig {
    fn default_max_requests() -> u32 {
        15
    }

    fn default_window_secs() -> u64 {
        60
    }

    fn default_cleanup_secs() -> u64 {
        300
    }

    /// Creates a configuration admitting `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_secs: window.as_secs(),
            ..Self::default()
        }
    }

    /// Returns the window length.
    #[inline]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Returns the cleanup interval.
    #[inline]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_secs)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("Rate limit must admit at least one request".to_owned());
        }

        if self.window_secs == 0 {
            return Err("Rate limit window must be at least one second".to_owned());
        }

        if self.cleanup_secs == 0 {
            return Err("Rate limit cleanup interval must be at least one second".to_owned());
        }

        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: Self::default_max_requests(),
            window_secs: Self::default_window_secs(),
            cleanup_secs: Self::default_cleanup_secs(),
        }
    }
}

/// In-memory fixed-window rate limiter.
///
/// State is process-local: with several instances behind a load balancer
/// the effective cap is `max_requests` times the instance count.
#[derive(Clone)]
pub struct RateLimiter {
    records: Arc<RwLock<HashMap<RateLimitKey, WindowRecord>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            max_requests = config.max_requests,
            window_secs = config.window_secs,
            "Rate limiter initialized"
        );

        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Returns the limiter configuration.
    #[inline]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records an attempt and returns whether it is admitted.
    ///
    /// Denied attempts do not count towards the window.
    pub async fn admit(&self, key: impl Into<RateLimitKey>) -> bool {
        let key = key.into();
        let now = Instant::now();
        let mut records = self.records.write().await;

        match records.get_mut(&key) {
            Some(record) if !record.is_expired(now) => {
                if record.count < self.config.max_requests {
                    record.count += 1;
                    true
                } else {
                    false
                }
            }
            _ => {
                records.insert(key, WindowRecord::open(now, self.config.window()));
                true
            }
        }
    }

    /// Checks admission for the given key, failing with `TooManyRequests`.
    pub async fn check(&self, key: impl Into<RateLimitKey>) -> HandlerResult<()> {
        let key = key.into();
        if self.admit(key).await {
            return Ok(());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            max_requests = self.config.max_requests,
            window_secs = self.config.window_secs,
            "Rate limit exceeded"
        );

        Err(ErrorKind::TooManyRequests
            .with_message("Слишком много запросов. Подождите минуту.")
            .with_context(format!("{key} exceeded {} requests", self.config.max_requests)))
    }

    /// Removes records whose window has ended and returns how many were
    /// removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        before - records.len()
    }

    /// Returns the number of tracked keys.
    pub async fn size(&self) -> usize {
        self.records.read().await.len()
    }

    /// Starts a background task that periodically evicts expired records.
    pub fn spawn_cleanup_task(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.cleanup_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let removed = limiter.evict_expired().await;
                if removed > 0 {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        removed_count = removed,
                        "Evicted expired rate limit records"
                    );
                }
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
