//! Shared-secret key management for caller token verification.

use std::fmt;
use std::sync::Arc;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, TRACING_TARGET_AUTHENTICATION as TRACING_TARGET};

/// Minimum accepted secret length in bytes.
const MIN_SECRET_LEN: usize = 16;

/// Token verification configuration.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
pub struct AuthKeysConfig {
    /// Shared HS256 secret of the auth provider.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "JWT_SECRET", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<String>,

    /// Expected `aud` claim.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "JWT_AUDIENCE", default_value = "authenticated")
    )]
    #[serde(default = "AuthKeysConfig::default_audience")]
    pub audience: String,
}

impl AuthKeysConfig {
    fn default_audience() -> String {
        "authenticated".to_owned()
    }

    /// Creates a configuration with the given secret and default audience.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Some(jwt_secret.into()),
            audience: Self::default_audience(),
        }
    }
}

impl Default for AuthKeysConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            audience: Self::default_audience(),
        }
    }
}

impl fmt::Debug for AuthKeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKeysConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("audience", &self.audience)
            .finish()
    }
}

/// Keys used to verify caller tokens.
///
/// Cheap to clone; the key material is shared.
#[derive(Clone)]
pub struct AuthKeys {
    inner: Arc<AuthKeysInner>,
}

struct AuthKeysInner {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    audience: String,
}

impl AuthKeys {
    /// Signing algorithm shared with the auth provider.
    pub const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Creates the keys from the provided configuration.
    pub fn from_config(config: &AuthKeysConfig) -> Result<Self> {
        let secret = config
            .jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| Error::auth("JWT secret is not configured"))?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::auth(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        if config.audience.trim().is_empty() {
            return Err(Error::config("JWT audience must not be empty"));
        }

        tracing::info!(
            target: TRACING_TARGET,
            audience = %config.audience,
            "Token verification keys loaded",
        );

        let inner = AuthKeysInner {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            audience: config.audience.clone(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns a reference to the decoding key.
    #[inline]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.inner.decoding_key
    }

    /// Returns a reference to the encoding key.
    #[inline]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.inner.encoding_key
    }

    /// Returns the expected audience.
    #[inline]
    pub fn audience(&self) -> &str {
        &self.inner.audience
    }
}

impl fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKeys")
            .field("audience", &self.inner.audience)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn loads_configured_secret() -> anyhow::Result<()> {
        let keys = AuthKeys::from_config(&AuthKeysConfig::new("a-very-long-test-secret"))?;
        assert_eq!(keys.audience(), "authenticated");
        Ok(())
    }

    #[test]
    fn rejects_missing_or_short_secret() {
        let missing = AuthKeys::from_config(&AuthKeysConfig::default());
        assert_eq!(missing.err().map(|e| e.kind()), Some(ErrorKind::Auth));

        let blank = AuthKeys::from_config(&AuthKeysConfig::new("   "));
        assert!(blank.is_err());

        let short = AuthKeys::from_config(&AuthKeysConfig::new("short"));
        assert!(short.is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AuthKeysConfig::new("a-very-long-test-secret");
        assert!(!format!("{config:?}").contains("a-very-long-test-secret"));
    }
}
