//! JWT authentication header extraction.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn handler(auth_header: AuthHeader) -> Result<impl IntoResponse> {
//!     let claims = auth_header.as_auth_claims();
//!     // Use the claims...
//! }
//! ```

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::AuthKeys;

/// JWT authentication header extractor.
///
/// The bearer token is validated for:
/// - Signature integrity using the shared secret
/// - Token expiration
/// - Required claims (sub, aud, exp)
/// - Audience matching
///
/// The validated header is cached in the request extensions, so several
/// extractors in one handler parse the token once.
#[must_use]
#[derive(Debug, Clone)]
pub struct AuthHeader {
    auth_claims: AuthClaims,
}

impl AuthHeader {
    /// Creates a new authentication header with the given claims.
    #[inline]
    pub const fn new(claims: AuthClaims) -> Self {
        Self {
            auth_claims: claims,
        }
    }

    /// Returns a reference to the JWT claims.
    #[inline]
    pub const fn as_auth_claims(&self) -> &AuthClaims {
        &self.auth_claims
    }

    /// Consumes this header and returns the JWT claims.
    #[inline]
    pub fn into_auth_claims(self) -> AuthClaims {
        self.auth_claims
    }
}

impl<S> FromRequestParts<S> for AuthHeader
where
    S: Sync + Send,
    AuthKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_header) = parts.extensions.get::<Self>() {
            return Ok(auth_header.clone());
        }

        type AuthBearerHeader = TypedHeader<Authorization<Bearer>>;
        let auth_keys = AuthKeys::from_ref(state);

        match AuthBearerHeader::from_request_parts(parts, state).await {
            Ok(bearer_header) => {
                let auth_claims = AuthClaims::from_token(bearer_header.token(), &auth_keys)?;
                let auth_header = Self::new(auth_claims);
                parts.extensions.insert(auth_header.clone());
                Ok(auth_header)
            }
            Err(rejection) => {
                let error = match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => ErrorKind::MissingAuthToken
                        .with_context("Missing Authorization header with Bearer token")
                        .with_resource("authentication"),
                    TypedHeaderRejectionReason::Error(_) => ErrorKind::MalformedAuthToken
                        .with_context("Authorization header must contain a valid Bearer token")
                        .with_resource("authentication"),
                    _ => ErrorKind::InternalServerError
                        .with_context("Unexpected error during header extraction")
                        .with_resource("authentication"),
                };
                Err(error)
            }
        }
    }
}

/// JWT claims issued by the auth provider.
///
/// | Claim | Field | Description |
/// |-------|-------|-------------|
/// | `sub` | `subject` | Caller identity |
/// | `aud` | `audience` | Token audience identifier |
/// | `exp` | `expires_at` | Expiration, seconds since the epoch |
/// | `iat` | `issued_at` | Issue time, seconds since the epoch |
/// | `email` | `email` | Caller email, if any |
/// | `role` | `role` | Provider role (`authenticated`, `anon`, ...) |
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthClaims {
    #[serde(rename = "sub")]
    pub subject: Uuid,
    #[serde(rename = "aud")]
    pub audience: String,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl AuthClaims {
    /// Creates claims for `subject` valid for `lifetime` from now.
    pub fn new(subject: Uuid, audience: impl Into<String>, lifetime: SignedDuration) -> Self {
        let now = Timestamp::now();
        Self {
            subject,
            audience: audience.into(),
            expires_at: now.as_second().saturating_add(lifetime.as_secs()),
            issued_at: Some(now.as_second()),
            email: None,
            role: Some("authenticated".to_owned()),
        }
    }

    /// Sets the provider role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Returns `true` if the token's expiration time has passed.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Timestamp::now().as_second()
    }

    /// Returns the remaining lifetime of this token, zero once expired.
    #[must_use]
    pub fn remaining_lifetime(&self) -> SignedDuration {
        let remaining = self.expires_at.saturating_sub(Timestamp::now().as_second());
        SignedDuration::from_secs(remaining.max(0))
    }

    /// Parses and validates a bearer token.
    pub fn from_token(token: &str, auth_keys: &AuthKeys) -> Result<Self> {
        let mut validation = Validation::new(AuthKeys::ALGORITHM);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = true;
        validation.set_audience(&[auth_keys.audience()]);
        validation.set_required_spec_claims(&["sub", "aud", "exp"]);

        let token_data = decode::<Self>(token, auth_keys.decoding_key(), &validation)?;
        let claims = token_data.claims;

        if claims.is_expired() {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                subject = %claims.subject,
                expires_at = claims.expires_at,
                "Token validation failed: token expired"
            );
            return Err(ErrorKind::Unauthorized.with_context("Token expired"));
        }

        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            subject = %claims.subject,
            remaining_secs = claims.remaining_lifetime().as_secs(),
            "Token validation completed"
        );

        Ok(claims)
    }

    /// Encodes the claims into a signed token.
    pub fn encode(&self, auth_keys: &AuthKeys) -> Result<String> {
        let header = Header::new(AuthKeys::ALGORITHM);
        encode(&header, self, auth_keys.encoding_key()).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_AUTHENTICATION,
                error = %e,
                subject = %self.subject,
                "Failed to encode token"
            );
            ErrorKind::InternalServerError.with_context("Unable to create token")
        })
    }
}

impl From<JwtError> for Error<'static> {
    fn from(error: JwtError) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            error = %error,
            "Token rejected"
        );

        match error.kind() {
            JwtErrorKind::ExpiredSignature => {
                ErrorKind::Unauthorized.with_context("Token signature has expired")
            }
            JwtErrorKind::InvalidSignature => {
                ErrorKind::Unauthorized.with_context("Token signature could not be verified")
            }
            JwtErrorKind::InvalidAudience => {
                ErrorKind::Unauthorized.with_context("Token was issued for a different audience")
            }
            JwtErrorKind::InvalidAlgorithm => ErrorKind::MalformedAuthToken
                .with_context("Token was signed with an incompatible algorithm"),
            JwtErrorKind::InvalidToken => {
                ErrorKind::MalformedAuthToken.with_context("Token format is unrecognized")
            }
            JwtErrorKind::MissingRequiredClaim(claim) => ErrorKind::MalformedAuthToken
                .with_context(format!("Token is missing required claim: {claim}")),
            JwtErrorKind::Base64(_) => {
                ErrorKind::MalformedAuthToken.with_context("Token contains invalid base64")
            }
            JwtErrorKind::Json(_) => {
                ErrorKind::MalformedAuthToken.with_context("Token payload is malformed")
            }
            _ => ErrorKind::InternalServerError
                .with_context("Unexpected error during token validation"),
        }
    }
}
