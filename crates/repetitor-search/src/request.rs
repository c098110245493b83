//! Search request and result types.

use serde::{Deserialize, Serialize};

/// Default number of results requested.
pub const DEFAULT_LIMIT: usize = 3;

/// Content extraction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOptions {
    /// Formats the provider should extract from each result page.
    pub formats: Vec<String>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            formats: vec!["markdown".to_owned()],
        }
    }
}

/// A web search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub lang: String,
    pub country: String,
    pub scrape_options: ScrapeOptions,
}

impl SearchRequest {
    /// Creates a Russian-locale request for the default number of results
    /// with markdown extraction.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            lang: "ru".to_owned(),
            country: "ru".to_owned(),
            scrape_options: ScrapeOptions::default(),
        }
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the language and country used for ranking.
    #[must_use]
    pub fn with_locale(mut self, lang: impl Into<String>, country: impl Into<String>) -> Self {
        self.lang = lang.into();
        self.country = country.into();
        self
    }
}

/// A single search hit. All fields are untrusted third-party text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SearchResult {
    /// Returns the extracted page content, falling back to the description.
    pub fn excerpt(&self) -> &str {
        self.markdown
            .as_deref()
            .filter(|markdown| !markdown.is_empty())
            .or(self.description.as_deref())
            .unwrap_or_default()
    }
}
