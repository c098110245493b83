//! Reqwest-based client for the streaming completion gateway.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;

use crate::{
    ChatMessage, CompletionRequest, DeltaStream, Error, GatewayConfig, Result,
    TRACING_TARGET_CLIENT,
};

/// Longest upstream error body kept in logs.
const MAX_LOGGED_BODY_CHARS: usize = 512;

/// Delta stream returned by [`GatewayClient::stream_chat`].
pub type GatewayStream = DeltaStream<BoxStream<'static, Result<Bytes>>>;

/// Inner client that holds the HTTP client and configuration.
struct GatewayClientInner {
    http: Client,
    config: GatewayConfig,
}

/// Client for the upstream chat-completion gateway.
///
/// Cheap to clone; clones share the connection pool.
///
/// # Examples
///
/// ```rust,ignore
/// use futures::StreamExt;
/// use repetitor_gateway::{ChatMessage, GatewayClient, GatewayConfig};
///
/// let client = GatewayClient::new(GatewayConfig::default().with_api_key("sk-..."))?;
/// let mut deltas = client
///     .stream_chat(&[ChatMessage::system("..."), ChatMessage::user("Привет")])
///     .await?;
/// while let Some(delta) = deltas.next().await {
///     print!("{}", delta?);
/// }
/// ```
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Creates a new client with the given configuration.
    ///
    /// A missing API key is not an error here; requests fail with
    /// [`Error::MissingCredentials`] instead.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("repetitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %config.endpoint,
            model = %config.model,
            credentials = config.has_credentials(),
            "Gateway client created"
        );

        let inner = GatewayClientInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Returns `true` if the client can authenticate against the gateway.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config().has_credentials()
    }

    /// Opens a streaming completion for the given messages.
    ///
    /// Resolves once the gateway has answered with a success status; the
    /// returned stream then yields text deltas as they arrive.
    pub async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<GatewayStream> {
        let config = self.config();
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingCredentials)?;

        let request = CompletionRequest::streaming(&config.model, messages);
        let response_timeout = config.response_timeout();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            model = %config.model,
            message_count = messages.len(),
            "Opening streaming completion"
        );

        let send = self
            .inner
            .http
            .post(config.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(response_timeout, send)
            .await
            .map_err(|_| Error::Timeout(response_timeout))??;

        let status = response.status();
        if !status.is_success() {
            let body = tokio::time::timeout(response_timeout, response.text())
                .await
                .ok()
                .and_then(|body| body.ok())
                .unwrap_or_default();

            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                status = %status,
                body = %truncate(&body, MAX_LOGGED_BODY_CHARS),
                "Gateway rejected completion request"
            );

            return Err(Error::from_status(status));
        }

        let idle_timeout = config.idle_timeout();
        let body = tokio_stream::StreamExt::timeout(response.bytes_stream(), idle_timeout)
            .map(move |item| match item {
                Ok(Ok(chunk)) => Ok(chunk),
                Ok(Err(error)) => Err(Error::Reqwest(error)),
                Err(_) => Err(Error::Timeout(idle_timeout)),
            })
            .boxed();

        Ok(DeltaStream::new(body))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
