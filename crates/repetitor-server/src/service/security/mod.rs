//! Security infrastructure services.
//!
//! Per-identity admission control and the shared secret used to verify
//! caller tokens.

mod auth_keys;
mod rate_limiter;

pub use auth_keys::{AuthKeys, AuthKeysConfig};
pub use rate_limiter::{RateLimitConfig, RateLimitKey, RateLimiter};
