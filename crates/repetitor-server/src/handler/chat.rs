//! Streaming chat relay handler.
//!
//! `POST /chat` authenticates the caller, validates the conversation, checks
//! the rate limit, optionally augments the system prompt with web context and
//! relays the gateway's incremental reply as Server-Sent Events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"..."}}]}
//! data: [DONE]
//! ```
//!
//! A failure after the first byte was sent ends the stream with
//! `data: {"error":"service unavailable"}` and no `[DONE]`. Closing the
//! connection stops the upstream read.

use std::convert::Infallible;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use futures::StreamExt;
use repetitor_gateway::{ChatMessage, GatewayClient, GatewayStream};
use serde_json::{Value, json};
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::extract::{AuthState, Json};
use crate::handler::request::ChatRequest;
use crate::handler::Result;
use crate::service::prompt::system_instruction;
use crate::service::{ContextAugmenter, RateLimiter, ServiceState};

/// Tracing target for chat operations.
const TRACING_TARGET: &str = "repetitor_server::handler::chat";

/// Capacity of the channel between the relay task and the response body.
const RELAY_BUFFER: usize = 32;

/// Relays a tutoring conversation to the completion gateway.
#[tracing::instrument(skip_all, fields(identity = %auth_state.identity()))]
async fn chat(
    State(gateway): State<GatewayClient>,
    State(augmenter): State<ContextAugmenter>,
    State(rate_limiter): State<RateLimiter>,
    auth_state: AuthState,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse> {
    let request = ChatRequest::from_value(&payload)?;

    tracing::debug!(
        target: TRACING_TARGET,
        message_count = request.messages.len(),
        user_type = %request.user_type,
        subject = %request.subject,
        "Chat request validated"
    );

    if !gateway.is_configured() {
        return Err(repetitor_gateway::Error::MissingCredentials.into());
    }

    rate_limiter.check(auth_state.identity()).await?;

    let context = augmenter
        .augment(request.latest_message(), &request.subject)
        .await;

    let mut instruction = system_instruction(&request);
    instruction.push_str(&context);

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage::system(instruction));
    messages.extend(request.history());

    let deltas = gateway.stream_chat(&messages).await?;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(RELAY_BUFFER);
    tokio::spawn(relay(deltas, tx, auth_state.identity()));

    tracing::info!(
        target: TRACING_TARGET,
        augmented = !context.is_empty(),
        "Chat stream started"
    );

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

/// Forwards deltas to the caller until the stream ends, fails, or the caller
/// goes away.
async fn relay(
    mut deltas: GatewayStream,
    tx: Sender<Result<Event, Infallible>>,
    identity: Uuid,
) {
    let mut delta_count = 0usize;

    loop {
        tokio::select! {
            _ = tx.closed() => {
                tracing::info!(
                    target: TRACING_TARGET,
                    identity = %identity,
                    delta_count,
                    "Client disconnected, cancelling chat stream"
                );
                return;
            }
            next = deltas.next() => match next {
                Some(Ok(delta)) => {
                    delta_count += 1;
                    if tx.send(Ok(delta_event(&delta))).await.is_err() {
                        tracing::info!(
                            target: TRACING_TARGET,
                            identity = %identity,
                            delta_count,
                            "Client disconnected, cancelling chat stream"
                        );
                        return;
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        identity = %identity,
                        delta_count,
                        error = %error,
                        "Chat stream failed"
                    );
                    let _ = tx.send(Ok(error_event())).await;
                    return;
                }
                None => {
                    let _ = tx.send(Ok(Event::default().data("[DONE]"))).await;
                    tracing::debug!(
                        target: TRACING_TARGET,
                        identity = %identity,
                        delta_count,
                        "Chat stream completed"
                    );
                    return;
                }
            }
        }
    }
}

fn delta_event(delta: &str) -> Event {
    let payload = json!({ "choices": [{ "delta": { "content": delta } }] });
    Event::default().data(payload.to_string())
}

fn error_event() -> Event {
    Event::default().data(json!({ "error": "service unavailable" }).to_string())
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/chat", post(chat))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use futures::stream;
    use jiff::SignedDuration;
    use repetitor_gateway::DeltaStream;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::extract::AuthClaims;
    use crate::handler::routes;
    use crate::handler::test::{
        create_test_config, create_test_server, create_test_server_with_state, create_test_token,
    };
    use crate::service::ServiceConfig;

    const SSE_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Давай \"}}]}\n\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"подумаем\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    async fn mount_gateway(server: &MockServer, response: ResponseTemplate, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(response)
            .expect(calls)
            .mount(server)
            .await;
    }

    fn stream_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream")
    }

    fn greeting() -> serde_json::Value {
        json!({ "messages": [{ "role": "user", "content": "Привет!" }] })
    }

    async fn setup(
        gateway: &MockServer,
        search: Option<&MockServer>,
    ) -> anyhow::Result<(TestServer, ServiceConfig, String)> {
        let config = create_test_config(Some(gateway), search)?;
        let server = create_test_server(&config).await?;
        let token = create_test_token(&config, Uuid::new_v4())?;
        Ok((server, config, token))
    }

    #[tokio::test]
    async fn relays_deltas_in_order() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "test-model", "stream": true })))
            .respond_with(stream_response())
            .expect(1)
            .mount(&gateway)
            .await;

        let (server, _, token) = setup(&gateway, None).await?;
        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&json!({
                "messages": [
                    { "role": "user", "content": "Сколько будет 2+2?" },
                    { "role": "assistant", "content": "А как ты думаешь?" },
                    { "role": "user", "content": "  Наверное, 4\u{0} " },
                ],
                "subject": "Математика",
                "classLevel": 2,
            }))
            .await;

        response.assert_status_ok();
        assert!(response.header("content-type").to_str()?.starts_with("text/event-stream"));

        let body = response.text();
        let first = body.find(r#"data: {"choices":[{"delta":{"content":"Давай "}}]}"#);
        let second = body.find(r#"data: {"choices":[{"delta":{"content":"подумаем"}}]}"#);
        let done = body.find("data: [DONE]");
        assert!(first.is_some() && second.is_some() && done.is_some(), "{body}");
        assert!(first < second && second < done);
        Ok(())
    }

    #[tokio::test]
    async fn replays_history_after_system_prompt() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [
                    { "role": "system" },
                    { "role": "user", "content": "Первый вопрос" },
                    { "role": "assistant", "content": "Ответ" },
                    { "role": "user", "content": "Второй вопрос" },
                ],
            })))
            .respond_with(stream_response())
            .expect(1)
            .mount(&gateway)
            .await;

        let (server, _, token) = setup(&gateway, None).await?;
        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&json!({
                "messages": [
                    { "role": "user", "content": "Первый вопрос" },
                    { "role": "assistant", "content": "Ответ" },
                    { "role": "user", "content": "Второй вопрос" },
                ],
            }))
            .await;

        response.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn rejects_missing_and_invalid_tokens() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        mount_gateway(&gateway, stream_response(), 0).await;
        let (server, config, _) = setup(&gateway, None).await?;

        let response = server.post("/chat").json(&greeting()).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "missing_auth_token");

        let response = server
            .post("/chat")
            .authorization_bearer("not-a-token")
            .json(&greeting())
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let keys = config.load_auth_keys()?;
        let expired = AuthClaims::new(Uuid::new_v4(), keys.audience(), SignedDuration::from_hours(-2))
            .encode(&keys)?;
        let response = server
            .post("/chat")
            .authorization_bearer(&expired)
            .json(&greeting())
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_invalid_payloads_before_upstream() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        mount_gateway(&gateway, stream_response(), 0).await;
        let config = create_test_config(Some(&gateway), None)?;
        let state = ServiceState::from_config(&config).await?;
        let rate_limiter = state.rate_limiter.clone();
        let server = create_test_server_with_state(routes(), state).await?;
        let token = create_test_token(&config, Uuid::new_v4())?;

        let payloads = [
            json!([]),
            json!({ "messages": [] }),
            json!({ "messages": [{ "role": "system", "content": "x" }] }),
            json!({ "messages": [{ "role": "user", "content": "   " }] }),
            json!({ "messages": [{ "role": "user", "content": "Привет" }], "classLevel": 15 }),
            json!({ "messages": [{ "role": "user", "content": "Привет" }], "subject": " " }),
        ];

        for payload in payloads {
            let response = server
                .post("/chat")
                .authorization_bearer(&token)
                .json(&payload)
                .await;
            response.assert_status_bad_request();
            let body: serde_json::Value = response.json();
            assert_eq!(body["code"], "bad_request", "{payload}");
            assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        }

        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .content_type("application/json")
            .text("{not json")
            .await;
        response.assert_status_bad_request();

        assert_eq!(rate_limiter.size().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn denies_after_cap_without_upstream_call() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        mount_gateway(&gateway, stream_response(), 15).await;
        let (server, _, token) = setup(&gateway, None).await?;

        for _ in 0..15 {
            server
                .post("/chat")
                .authorization_bearer(&token)
                .json(&greeting())
                .await
                .assert_status_ok();
        }

        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&greeting())
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "too_many_requests");
        Ok(())
    }

    #[tokio::test]
    async fn maps_upstream_failures() -> anyhow::Result<()> {
        let cases = [
            (429, StatusCode::TOO_MANY_REQUESTS, "upstream_rate_limited"),
            (402, StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            (500, StatusCode::BAD_GATEWAY, "bad_gateway"),
        ];

        for (upstream, expected, code) in cases {
            let gateway = MockServer::start().await;
            mount_gateway(
                &gateway,
                ResponseTemplate::new(upstream).set_body_string("secret upstream detail"),
                1,
            )
            .await;
            let (server, _, token) = setup(&gateway, None).await?;

            let response = server
                .post("/chat")
                .authorization_bearer(&token)
                .json(&greeting())
                .await;

            response.assert_status(expected);
            let body: serde_json::Value = response.json();
            assert_eq!(body["code"], code);
            assert!(!response.text().contains("secret upstream detail"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_without_sentinel() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Начнём\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"потеряно\"}}]}\n\n",
        );
        mount_gateway(
            &gateway,
            ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
            1,
        )
        .await;
        let (server, _, token) = setup(&gateway, None).await?;

        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&greeting())
            .await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Начнём"));
        assert!(text.contains(r#"data: {"error":"service unavailable"}"#));
        assert!(!text.contains("потеряно"));
        assert!(!text.contains("[DONE]"));
        assert!(!text.contains("overloaded"));
        Ok(())
    }

    #[tokio::test]
    async fn unconfigured_gateway_is_internal_error() -> anyhow::Result<()> {
        let config = create_test_config(None, None)?;
        let server = create_test_server(&config).await?;
        let token = create_test_token(&config, Uuid::new_v4())?;

        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&greeting())
            .await;

        response.assert_status_internal_server_error();
        Ok(())
    }

    #[tokio::test]
    async fn factual_question_adds_web_context() -> anyhow::Result<()> {
        let search = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .and(body_string_contains("учебник школа"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{ "title": "Атом", "markdown": "<b>Атом</b> — частица<script>x()</script>" }],
            })))
            .expect(1)
            .mount(&search)
            .await;

        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("ДОПОЛНИТЕЛЬНЫЙ КОНТЕКСТ ИЗ ИНТЕРНЕТА"))
            .and(body_string_contains("[Атом]\\nАтом — частица"))
            .respond_with(stream_response())
            .expect(1)
            .mount(&gateway)
            .await;

        let (server, _, token) = setup(&gateway, Some(&search)).await?;
        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&json!({
                "messages": [{ "role": "user", "content": "Что такое атом?" }],
                "subject": "Химия",
            }))
            .await;

        response.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn search_failure_does_not_block_reply() -> anyhow::Result<()> {
        let search = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&search)
            .await;

        let gateway = MockServer::start().await;
        mount_gateway(&gateway, stream_response(), 1).await;

        let (server, _, token) = setup(&gateway, Some(&search)).await?;
        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&json!({ "messages": [{ "role": "user", "content": "Что такое атом?" }] }))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("data: [DONE]"));
        Ok(())
    }

    #[tokio::test]
    async fn greeting_skips_web_context() -> anyhow::Result<()> {
        let search = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&search)
            .await;

        let gateway = MockServer::start().await;
        mount_gateway(&gateway, stream_response(), 1).await;

        let (server, _, token) = setup(&gateway, Some(&search)).await?;
        let response = server
            .post("/chat")
            .authorization_bearer(&token)
            .json(&greeting())
            .await;
        response.assert_status_ok();

        let requests = gateway.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
        assert_eq!(body["messages"][0]["role"], "system");
        let system = body["messages"][0]["content"].as_str().unwrap_or_default();
        assert!(!system.is_empty());
        assert!(!system.contains("ДОПОЛНИТЕЛЬНЫЙ КОНТЕКСТ"));
        Ok(())
    }

    #[tokio::test]
    async fn relay_stops_reading_after_disconnect() -> anyhow::Result<()> {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let upstream = stream::repeat_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            ))
        })
        .boxed();

        let (tx, mut rx) = tokio::sync::mpsc::channel(RELAY_BUFFER);
        let task = tokio::spawn(relay(DeltaStream::new(upstream), tx, Uuid::new_v4()));

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), task).await??;
        let after_exit = polls.load(Ordering::SeqCst);
        assert!(after_exit >= 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(polls.load(Ordering::SeqCst), after_exit);
        Ok(())
    }
}
