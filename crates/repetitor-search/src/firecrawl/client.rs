//! Reqwest-based Firecrawl search client.

use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;

use super::{FirecrawlConfig, TRACING_TARGET};
use crate::{Error, Result, SearchProvider, SearchRequest, SearchResult, SearchService};

/// Search response envelope.
#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchResult>,
}

struct FirecrawlClientInner {
    http: Client,
    config: FirecrawlConfig,
}

/// Firecrawl search client.
#[derive(Clone)]
pub struct FirecrawlClient {
    inner: Arc<FirecrawlClientInner>,
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl FirecrawlClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: FirecrawlConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("repetitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %config.endpoint,
            credentials = config.has_credentials(),
            "Firecrawl client created"
        );

        let inner = FirecrawlClientInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &FirecrawlConfig {
        &self.inner.config
    }

    /// Wraps the client into an observable [`SearchService`].
    pub fn into_service(self) -> SearchService {
        SearchService::new(self)
    }
}

#[async_trait::async_trait]
impl SearchProvider for FirecrawlClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let config = self.config();
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingCredentials)?;

        let response = self
            .inner
            .http
            .post(config.endpoint.clone())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let body = response.bytes().await?;
        let response: SearchResponse = serde_json::from_slice(&body)?;

        if !response.success {
            tracing::debug!(
                target: TRACING_TARGET,
                result_count = response.data.len(),
                "Search response not flagged as successful"
            );
        }

        Ok(response.data)
    }

    fn is_configured(&self) -> bool {
        self.config().has_credentials()
    }
}
