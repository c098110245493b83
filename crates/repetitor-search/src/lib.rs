#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod request;
mod service;

pub mod firecrawl;

pub use crate::error::{Error, Result};
pub use crate::request::{ScrapeOptions, SearchRequest, SearchResult};
pub use crate::service::SearchService;

/// Tracing target for search operations.
pub const TRACING_TARGET: &str = "repetitor_search";

/// Core trait for web search providers.
///
/// Implement this trait to plug a different search backend into the
/// context augmenter.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a search and returns the results in ranking order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;

    /// Returns `false` if the provider is known to be unusable, for example
    /// because no credentials are configured.
    fn is_configured(&self) -> bool {
        true
    }
}
