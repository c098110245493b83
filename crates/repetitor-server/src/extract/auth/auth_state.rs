//! Authenticated caller extractor.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use derive_more::Deref;
use uuid::Uuid;

use super::{AuthClaims, AuthHeader};
use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::AuthKeys;

/// Provider role carried by anonymous (public API key) tokens.
const ANONYMOUS_ROLE: &str = "anon";

/// Authenticated caller.
///
/// Extraction succeeds only for a valid token that belongs to a signed-in
/// user; anonymous provider tokens are rejected. Dereferences to the
/// underlying [`AuthClaims`].
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct AuthState(pub AuthClaims);

impl AuthState {
    /// Creates a new authenticated state from validated claims.
    #[inline]
    pub const fn new(claims: AuthClaims) -> Self {
        Self(claims)
    }

    /// Returns the caller identity.
    #[inline]
    pub fn identity(&self) -> Uuid {
        self.0.subject
    }

    fn from_header(auth_header: AuthHeader) -> Result<Self> {
        let claims = auth_header.into_auth_claims();

        if claims.role.as_deref() == Some(ANONYMOUS_ROLE) {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                subject = %claims.subject,
                "Anonymous token rejected"
            );
            return Err(ErrorKind::Unauthorized
                .with_context("Anonymous tokens cannot use the relay")
                .with_resource("authentication"));
        }

        Ok(Self::new(claims))
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Sync + Send,
    AuthKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_state) = parts.extensions.get::<Self>() {
            return Ok(auth_state.clone());
        }

        let auth_header = AuthHeader::from_request_parts(parts, state).await?;
        let auth_state = Self::from_header(auth_header)?;

        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            identity = %auth_state.identity(),
            "Caller authenticated"
        );

        parts.extensions.insert(auth_state.clone());
        Ok(auth_state)
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    #[test]
    fn rejects_anonymous_role() {
        let claims = AuthClaims::new(Uuid::new_v4(), "authenticated", SignedDuration::from_hours(1))
            .with_role(ANONYMOUS_ROLE);
        let error = AuthState::from_header(AuthHeader::new(claims)).err();
        assert_eq!(error.map(|e| e.kind()), Some(ErrorKind::Unauthorized));
    }

    #[test]
    fn exposes_identity() -> anyhow::Result<()> {
        let subject = Uuid::new_v4();
        let claims = AuthClaims::new(subject, "authenticated", SignedDuration::from_hours(1));
        let state = AuthState::from_header(AuthHeader::new(claims))?;
        assert_eq!(state.identity(), subject);
        assert_eq!(state.audience, "authenticated");
        Ok(())
    }
}
