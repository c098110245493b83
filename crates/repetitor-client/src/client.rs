//! Reqwest-based client for the chat relay.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use repetitor_gateway::DeltaStream;
use url::Url;

use crate::options::RelayRequest;
use crate::{ChatMessage, ChatOptions, Error, Result, TRACING_TARGET_CLIENT};

/// Delta stream returned by [`RelayClient::stream_chat`].
pub type RelayStream = DeltaStream<BoxStream<'static, repetitor_gateway::Result<Bytes>>>;

struct RelayClientInner {
    http: Client,
    endpoint: Url,
    token: String,
}

/// Client for the relay's `POST /chat` endpoint.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RelayClient {
    inner: Arc<RelayClientInner>,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl RelayClient {
    /// Creates a client for the given chat endpoint and bearer token.
    pub fn new(endpoint: Url, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("repetitor-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let inner = RelayClientInner {
            http,
            endpoint,
            token: token.into(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the chat endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Sends the conversation and opens the reply stream.
    ///
    /// Resolves once the relay has accepted the request; the returned stream
    /// yields text deltas in arrival order and ends with the relay's sentinel
    /// or with a single error.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<RelayStream> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %self.inner.endpoint,
            message_count = messages.len(),
            "Sending chat request"
        );

        let request = RelayRequest { messages, options };
        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .bearer_auth(&self.inner.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = Error::from_response(status, &body);

            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                status = %status,
                error = %error,
                "Relay rejected chat request"
            );

            return Err(error);
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(repetitor_gateway::Error::from))
            .boxed();

        Ok(DeltaStream::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> anyhow::Result<RelayClient> {
        let endpoint = format!("{}/chat", server.uri()).parse()?;
        Ok(RelayClient::new(endpoint, "token")?)
    }

    #[tokio::test]
    async fn streams_deltas() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Закон \"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Ома\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(bearer_token("token"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{ "role": "user", "content": "Что такое закон Ома?" }],
                "subject": "Физика",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let options = ChatOptions::default().with_subject("Физика");
        let mut stream = client
            .stream_chat(&[ChatMessage::user("Что такое закон Ома?")], &options)
            .await?;

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            text.push_str(&delta?);
        }

        assert_eq!(text, "Закон Ома");
        Ok(())
    }

    #[tokio::test]
    async fn maps_rejections() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "Сообщение не может быть пустым",
                "code": "bad_request",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let result = client
            .stream_chat(&[ChatMessage::user(" ")], &ChatOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(Error::InvalidRequest(ref reason)) if reason == "Сообщение не может быть пустым"
        ));
        Ok(())
    }
}
