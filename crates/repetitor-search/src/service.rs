//! Search service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{Result, SearchProvider, SearchRequest, SearchResult, TRACING_TARGET};

/// Search service wrapper with observability.
///
/// Adds structured logging to any search provider. The provider is wrapped in
/// `Arc` for cheap cloning.
#[derive(Clone)]
pub struct SearchService {
    inner: Arc<dyn SearchProvider>,
}

impl fmt::Debug for SearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchService")
            .field("configured", &self.inner.is_configured())
            .finish_non_exhaustive()
    }
}

impl SearchService {
    /// Creates a new search service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: SearchProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Returns `true` if the underlying provider is usable.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    /// Runs a search through the provider.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            query_chars = request.query.chars().count(),
            limit = request.limit,
            "Searching the web"
        );

        let result = self.inner.search(request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(results) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    result_count = results.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Search completed"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Search failed"
                );
            }
        }

        result
    }
}
