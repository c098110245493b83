//! Per-conversation request options.

use serde::{Deserialize, Serialize};

use crate::ChatMessage;

/// Learner profile and topic sent with every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    pub user_type: String,
    pub subject: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_level: Option<u8>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            user_type: "SCHOOLER".to_owned(),
            subject: "Общий".to_owned(),
            mode: "explain".to_owned(),
            class_level: None,
        }
    }
}

impl ChatOptions {
    /// Sets the learner type.
    #[must_use]
    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = user_type.into();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the tutoring mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Sets the class level.
    #[must_use]
    pub fn with_class_level(mut self, class_level: u8) -> Self {
        self.class_level = Some(class_level);
        self
    }
}

/// Body of a relay request.
#[derive(Debug, Serialize)]
pub(crate) struct RelayRequest<'a> {
    pub messages: &'a [ChatMessage],
    #[serde(flatten)]
    pub options: &'a ChatOptions,
}
