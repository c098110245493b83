//! Web-context augmenter.

use std::time::Duration;

use repetitor_search::{SearchRequest, SearchResult, SearchService};

use super::{AugmentConfig, SearchTriggers, TRACING_TARGET};
use crate::service::sanitize::{sanitize_input, sanitize_snippet};

/// Longest query text sent to the search provider.
const MAX_QUERY_CHARS: usize = 200;
/// Longest subject text sent to the search provider.
const MAX_SUBJECT_CHARS: usize = 100;
/// Longest title kept per snippet.
const MAX_TITLE_CHARS: usize = 200;
/// Longest excerpt kept per snippet.
const MAX_EXCERPT_CHARS: usize = 800;

/// Heading that introduces the appended context.
const CONTEXT_MARKER: &str =
    "\n\n[ДОПОЛНИТЕЛЬНЫЙ КОНТЕКСТ ИЗ ИНТЕРНЕТА — используй для точности ответа]:\n";
/// Separator between two snippets.
const SNIPPET_SEPARATOR: &str = "\n\n---\n\n";

/// Decides whether to search the web for a message and turns the results
/// into a sanitized system prompt suffix.
///
/// Every failure (unconfigured provider, error status, transport error,
/// malformed body, time budget exceeded) yields an empty suffix.
#[derive(Debug, Clone)]
pub struct ContextAugmenter {
    search: SearchService,
    triggers: SearchTriggers,
    timeout: Duration,
    result_limit: usize,
}

impl ContextAugmenter {
    /// Creates an augmenter with the default trigger keywords.
    pub fn new(search: SearchService, config: &AugmentConfig) -> Self {
        Self {
            search,
            triggers: SearchTriggers::default(),
            timeout: config.search_timeout(),
            result_limit: config.search_result_limit,
        }
    }

    /// Replaces the trigger policy.
    pub fn with_triggers(mut self, triggers: SearchTriggers) -> Self {
        self.triggers = triggers;
        self
    }

    /// Returns `true` if web search can run at all.
    pub fn is_configured(&self) -> bool {
        self.search.is_configured()
    }

    /// Returns the prompt suffix for `message`, possibly empty.
    pub async fn augment(&self, message: &str, subject: &str) -> String {
        if !self.triggers.matches(message) {
            tracing::trace!(target: TRACING_TARGET, "No search trigger matched");
            return String::new();
        }

        if !self.search.is_configured() {
            tracing::debug!(
                target: TRACING_TARGET,
                "Search trigger matched but search is not configured"
            );
            return String::new();
        }

        let query = sanitize_input(message, MAX_QUERY_CHARS);
        let subject = sanitize_input(subject, MAX_SUBJECT_CHARS);
        let request = SearchRequest::new(format!("{subject} {query} учебник школа"))
            .with_limit(self.result_limit);

        let results = match tokio::time::timeout(self.timeout, self.search.search(&request)).await
        {
            Ok(Ok(results)) => results,
            Ok(Err(error)) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Web search failed, continuing without context"
                );
                return String::new();
            }
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    timeout_ms = self.timeout.as_millis(),
                    "Web search timed out, continuing without context"
                );
                return String::new();
            }
        };

        let suffix = format_snippets(&results, self.result_limit);
        tracing::debug!(
            target: TRACING_TARGET,
            result_count = results.len(),
            suffix_chars = suffix.chars().count(),
            "Web context prepared"
        );
        suffix
    }
}

/// Formats up to `limit` results as `[title]\nexcerpt` blocks under the
/// context marker. Results that are empty after sanitization are skipped.
fn format_snippets(results: &[SearchResult], limit: usize) -> String {
    let blocks: Vec<String> = results
        .iter()
        .take(limit)
        .filter_map(|result| {
            let title = sanitize_snippet(result.title.as_deref().unwrap_or_default(), MAX_TITLE_CHARS);
            let excerpt = sanitize_snippet(result.excerpt(), MAX_EXCERPT_CHARS);
            if title.is_empty() && excerpt.is_empty() {
                return None;
            }
            Some(format!("[{title}]\n{excerpt}"))
        })
        .collect();

    if blocks.is_empty() {
        return String::new();
    }

    format!("{CONTEXT_MARKER}{}", blocks.join(SNIPPET_SEPARATOR))
}
