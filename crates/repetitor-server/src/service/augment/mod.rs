//! Optional web-context augmentation of the system prompt.

mod augmenter;
mod config;
mod triggers;

pub use augmenter::ContextAugmenter;
pub use config::AugmentConfig;
pub use triggers::SearchTriggers;

/// Tracing target for context augmentation.
pub(crate) const TRACING_TARGET: &str = "repetitor_server::service::augment";
