//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Recovery (panics, header timeout, service errors)
//! - Observability (request IDs, tracing spans, header redaction)
//! - Security (CORS, body limits)
//!
//! ```rust,ignore
//! use repetitor_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app = routes()
//!     .with_state(state)
//!     .with_default_security()
//!     .with_observability()
//!     .with_default_recovery();
//! ```

mod observability;
mod recovery;
mod security;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, DEFAULT_MAX_BODY_SIZE, RouterSecurityExt};
