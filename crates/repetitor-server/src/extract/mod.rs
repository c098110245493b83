//! HTTP request extractors with error responses in the relay's format.
//!
//! - [`AuthHeader`] - Bearer token extraction and signature validation
//! - [`AuthClaims`] - Claims issued by the auth provider
//! - [`AuthState`] - Authenticated caller, the identity the relay works for
//! - [`Json`] - JSON body extraction with client-safe rejection messages

pub mod auth;
pub mod reject;

pub use crate::TRACING_TARGET_AUTHENTICATION;
pub use crate::extract::auth::{AuthClaims, AuthHeader, AuthState};
pub use crate::extract::reject::Json;
