//! Conversation transcript assembled from relay replies.

use futures::StreamExt;

use crate::{ChatMessage, ChatOptions, RelayClient, Result, Role, TRACING_TARGET_CLIENT};

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A user or assistant message. `streaming` is set while deltas are
    /// still being appended.
    Message {
        role: Role,
        content: String,
        streaming: bool,
    },
    /// An inline notice shown in place of a failed reply.
    Error(String),
}

impl Entry {
    /// Returns the text of the entry.
    pub fn content(&self) -> &str {
        match self {
            Self::Message { content, .. } => content,
            Self::Error(message) => message,
        }
    }

    /// Returns `true` for an assistant message still receiving deltas.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Message { streaming: true, .. })
    }
}

/// Growing conversation transcript.
///
/// Only the trailing streaming entry is ever modified; everything before it
/// is final.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    entries: Vec<Entry>,
    options: ChatOptions,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new(options: ChatOptions) -> Self {
        Self {
            entries: Vec::new(),
            options,
        }
    }

    /// Returns the options sent with every turn.
    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Returns the entries, oldest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Appends a final user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(Entry::Message {
            role: Role::User,
            content: content.into(),
            streaming: false,
        });
    }

    /// Appends an empty streaming assistant entry.
    pub fn begin_assistant(&mut self) {
        self.entries.push(Entry::Message {
            role: Role::Assistant,
            content: String::new(),
            streaming: true,
        });
    }

    /// Appends a delta to the streaming assistant entry.
    ///
    /// Ignored when no entry is streaming.
    pub fn append_delta(&mut self, delta: &str) {
        if let Some(Entry::Message {
            content,
            streaming: true,
            ..
        }) = self.entries.last_mut()
        {
            content.push_str(delta);
        }
    }

    /// Marks the streaming assistant entry as final.
    pub fn finalize(&mut self) {
        if let Some(Entry::Message { streaming, .. }) = self.entries.last_mut() {
            *streaming = false;
        }
    }

    /// Ends the streaming entry with a failure and appends an error notice.
    ///
    /// An assistant entry that received no text is removed; partial text is
    /// kept as a final message.
    pub fn fail(&mut self, message: impl Into<String>) {
        let (streaming, empty) = self
            .entries
            .last()
            .map_or((false, false), |entry| {
                (entry.is_streaming(), entry.content().is_empty())
            });

        if streaming && empty {
            self.entries.pop();
        } else if streaming {
            self.finalize();
        }

        self.entries.push(Entry::Error(message.into()));
    }

    /// Returns the final user and assistant messages to replay to the relay.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Message {
                    role: role @ (Role::User | Role::Assistant),
                    content,
                    streaming: false,
                } => Some(ChatMessage::new(*role, content.clone())),
                _ => None,
            })
            .collect()
    }

    /// Sends a user turn and appends the streamed reply.
    ///
    /// On failure the transcript ends with an error notice and the error is
    /// returned as well.
    pub async fn send(&mut self, client: &RelayClient, content: impl Into<String>) -> Result<()> {
        self.push_user(content);
        let history = self.history();
        self.begin_assistant();

        match self.receive(client, &history).await {
            Ok(()) => {
                self.finalize();
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_CLIENT,
                    error = %error,
                    "Chat reply failed"
                );
                self.fail(error.user_message());
                Err(error)
            }
        }
    }

    async fn receive(&mut self, client: &RelayClient, history: &[ChatMessage]) -> Result<()> {
        let mut deltas = client.stream_chat(history, &self.options).await?;
        while let Some(delta) = deltas.next().await {
            self.append_delta(&delta?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::Error;

    fn client_for(server: &MockServer) -> anyhow::Result<RelayClient> {
        let endpoint = format!("{}/chat", server.uri()).parse()?;
        Ok(RelayClient::new(endpoint, "token")?)
    }

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    #[test]
    fn failure_without_text_drops_placeholder() {
        let mut conversation = Conversation::default();
        conversation.push_user("Привет");
        conversation.begin_assistant();
        conversation.fail("Ошибка");

        assert_eq!(conversation.entries().len(), 2);
        assert_eq!(conversation.entries()[1], Entry::Error("Ошибка".to_owned()));
    }

    #[test]
    fn failure_keeps_partial_text() {
        let mut conversation = Conversation::default();
        conversation.push_user("Привет");
        conversation.begin_assistant();
        conversation.append_delta("Здрав");
        conversation.fail("Ошибка");

        assert_eq!(
            conversation.entries()[1],
            Entry::Message {
                role: Role::Assistant,
                content: "Здрав".to_owned(),
                streaming: false,
            }
        );
        assert_eq!(conversation.entries()[2], Entry::Error("Ошибка".to_owned()));
    }

    #[test]
    fn history_skips_errors_and_streaming() {
        let mut conversation = Conversation::default();
        conversation.push_user("Первый");
        conversation.begin_assistant();
        conversation.fail("Ошибка");
        conversation.push_user("Второй");
        conversation.begin_assistant();
        conversation.append_delta("частично");

        let history = conversation.history();
        assert_eq!(
            history,
            vec![ChatMessage::user("Первый"), ChatMessage::user("Второй")]
        );
    }

    #[tokio::test]
    async fn send_appends_reply_and_replays_history() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    { "role": "user", "content": "Привет" },
                    { "role": "assistant", "content": "Здравствуй!" },
                    { "role": "user", "content": "Как дела?" },
                ],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!("{}data: [DONE]\n\n", delta("Хорошо")),
                "text/event-stream",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!("{}{}data: [DONE]\n\n", delta("Здрав"), delta("ствуй!")),
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let mut conversation = Conversation::default();
        conversation.send(&client, "Привет").await?;
        conversation.send(&client, "Как дела?").await?;

        let contents: Vec<&str> = conversation.entries().iter().map(Entry::content).collect();
        assert_eq!(contents, ["Привет", "Здравствуй!", "Как дела?", "Хорошо"]);
        assert!(!conversation.entries().iter().any(Entry::is_streaming));
        Ok(())
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_partial_reply() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!("{}data: {{\"error\":\"service unavailable\"}}\n\n", delta("Нач")),
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let mut conversation = Conversation::default();
        let result = conversation.send(&client, "Привет").await;

        assert!(matches!(result, Err(Error::Stream(_))));
        let entries = conversation.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].content(), "Нач");
        assert!(!entries[1].is_streaming());
        assert!(matches!(entries[2], Entry::Error(_)));
        Ok(())
    }

    #[tokio::test]
    async fn rate_limited_send_leaves_notice() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": "Слишком много запросов. Подождите минуту.",
                "code": "too_many_requests",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let mut conversation = Conversation::default();
        let result = conversation.send(&client, "Привет").await;

        assert!(matches!(result, Err(Error::RateLimited)));
        assert_eq!(conversation.entries().len(), 2);
        assert_eq!(
            conversation.entries()[1],
            Entry::Error(Error::RateLimited.user_message())
        );
        Ok(())
    }
}
