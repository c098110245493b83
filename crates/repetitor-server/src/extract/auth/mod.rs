//! Caller authentication.
//!
//! Tokens are HS256 JWTs signed by the auth provider with a shared secret.
//! The `sub` claim is the identity used for rate limiting.

mod auth_state;
mod jwt_header;

pub use self::auth_state::AuthState;
pub use self::jwt_header::{AuthClaims, AuthHeader};
