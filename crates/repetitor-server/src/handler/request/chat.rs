//! Inbound chat request and its validator.
//!
//! The body is taken as an untyped [`serde_json::Value`] so that each field
//! can be checked on its own: supplied-but-invalid fields fail the request,
//! missing optional fields take their defaults.

use repetitor_gateway::ChatMessage;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use crate::handler::{Error, ErrorKind};
use crate::service::sanitize::sanitize_input;

/// Maximum number of turns in one request.
pub const MAX_MESSAGES: usize = 50;
/// Maximum characters kept per turn.
pub const MAX_CONTENT_CHARS: usize = 4000;
/// Maximum characters kept for the subject.
pub const MAX_SUBJECT_CHARS: usize = 100;
/// Maximum characters kept for the mode.
pub const MAX_MODE_CHARS: usize = 50;
/// Inclusive class level bounds.
pub const CLASS_LEVELS: std::ops::RangeInclusive<i64> = 1..=11;

/// Subject used when the caller supplies none.
pub const DEFAULT_SUBJECT: &str = "Общий";
/// Mode used when the caller supplies none.
pub const DEFAULT_MODE: &str = "explain";

/// Reason a chat request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The body is not a JSON object.
    #[error("request body must be a JSON object")]
    NotAnObject,
    /// `messages` is missing, not an array or empty.
    #[error("messages must be a non-empty array")]
    MissingMessages,
    /// More than [`MAX_MESSAGES`] turns.
    #[error("too many messages (max {})", MAX_MESSAGES)]
    TooManyMessages,
    /// The turn at this index is not an object.
    #[error("messages[{0}] must be an object")]
    MessageNotAnObject(usize),
    /// The turn at this index has an unknown role.
    #[error("messages[{0}].role must be \"user\" or \"assistant\"")]
    InvalidRole(usize),
    /// The turn at this index has no usable text.
    #[error("messages[{0}].content must be a non-empty string")]
    InvalidContent(usize),
    /// A supplied subject is not a string or is blank.
    #[error("subject must be a non-empty string")]
    InvalidSubject,
    /// A supplied mode is not a string.
    #[error("mode must be a string")]
    InvalidMode,
    /// A supplied class level is not an integer in range.
    #[error("classLevel must be an integer from 1 to 11")]
    InvalidClassLevel,
}

impl From<ValidationError> for Error<'static> {
    fn from(error: ValidationError) -> Self {
        ErrorKind::BadRequest
            .with_message(error.to_string())
            .with_resource("chat")
    }
}

/// Learner category; selects the tutoring persona.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Preschooler,
    #[default]
    Schooler,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One validated conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Who wrote the turn.
    pub role: TurnRole,
    /// Sanitized text, at most [`MAX_CONTENT_CHARS`] characters.
    pub content: String,
}

impl From<&ChatTurn> for ChatMessage {
    fn from(turn: &ChatTurn) -> Self {
        match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        }
    }
}

/// A validated chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Turns, oldest first.
    pub messages: Vec<ChatTurn>,
    /// Persona selector; unknown values fall back to the default.
    pub user_type: UserType,
    /// Sanitized subject, never blank.
    pub subject: String,
    /// Sanitized tutoring mode; may be empty.
    pub mode: String,
    /// School year, when supplied.
    pub class_level: Option<u8>,
}

impl ChatRequest {
    /// Validates and sanitizes an arbitrary JSON payload.
    pub fn from_value(payload: &Value) -> Result<Self, ValidationError> {
        let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        Ok(Self {
            messages: parse_messages(object)?,
            user_type: parse_user_type(object),
            subject: parse_subject(object)?,
            mode: parse_mode(object)?,
            class_level: parse_class_level(object)?,
        })
    }

    /// Content of the most recent turn.
    pub fn latest_message(&self) -> &str {
        self.messages
            .last()
            .map(|turn| turn.content.as_str())
            .unwrap_or_default()
    }

    /// Turns converted for the completion gateway, oldest first.
    pub fn history(&self) -> impl Iterator<Item = ChatMessage> + '_ {
        self.messages.iter().map(ChatMessage::from)
    }
}

fn parse_messages(object: &Map<String, Value>) -> Result<Vec<ChatTurn>, ValidationError> {
    let messages = object
        .get("messages")
        .and_then(Value::as_array)
        .filter(|messages| !messages.is_empty())
        .ok_or(ValidationError::MissingMessages)?;

    if messages.len() > MAX_MESSAGES {
        return Err(ValidationError::TooManyMessages);
    }

    messages
        .iter()
        .enumerate()
        .map(|(index, message)| parse_turn(index, message))
        .collect()
}

fn parse_turn(index: usize, message: &Value) -> Result<ChatTurn, ValidationError> {
    let message = message
        .as_object()
        .ok_or(ValidationError::MessageNotAnObject(index))?;

    let role = message
        .get("role")
        .and_then(Value::as_str)
        .and_then(|role| role.parse::<TurnRole>().ok())
        .ok_or(ValidationError::InvalidRole(index))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
        .map(|content| sanitize_input(content, MAX_CONTENT_CHARS))
        .filter(|content| !content.is_empty())
        .ok_or(ValidationError::InvalidContent(index))?;

    Ok(ChatTurn { role, content })
}

fn parse_user_type(object: &Map<String, Value>) -> UserType {
    object
        .get("userType")
        .and_then(Value::as_str)
        .and_then(|user_type| user_type.parse().ok())
        .unwrap_or_default()
}

fn parse_subject(object: &Map<String, Value>) -> Result<String, ValidationError> {
    match object.get("subject") {
        None | Some(Value::Null) => Ok(DEFAULT_SUBJECT.to_owned()),
        Some(subject) => subject
            .as_str()
            .map(|subject| sanitize_input(subject, MAX_SUBJECT_CHARS))
            .filter(|subject| !subject.is_empty())
            .ok_or(ValidationError::InvalidSubject),
    }
}

fn parse_mode(object: &Map<String, Value>) -> Result<String, ValidationError> {
    match object.get("mode") {
        None | Some(Value::Null) => Ok(DEFAULT_MODE.to_owned()),
        Some(mode) => mode
            .as_str()
            .map(|mode| sanitize_input(mode, MAX_MODE_CHARS))
            .ok_or(ValidationError::InvalidMode),
    }
}

fn parse_class_level(object: &Map<String, Value>) -> Result<Option<u8>, ValidationError> {
    let value = match object.get("classLevel") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let level = value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|level| level.fract() == 0.0 && level.abs() < 1e6)
                .map(|level| level as i64)
        })
        .filter(|level| CLASS_LEVELS.contains(level))
        .ok_or(ValidationError::InvalidClassLevel)?;

    u8::try_from(level)
        .map(Some)
        .map_err(|_| ValidationError::InvalidClassLevel)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn with_messages(extra: Value) -> Value {
        let mut payload = json!({ "messages": [{ "role": "user", "content": "Привет" }] });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        payload
    }

    #[test]
    fn defaults_apply() -> anyhow::Result<()> {
        let request = ChatRequest::from_value(&with_messages(json!({})))?;

        assert_eq!(request.user_type, UserType::Schooler);
        assert_eq!(request.subject, DEFAULT_SUBJECT);
        assert_eq!(request.mode, DEFAULT_MODE);
        assert_eq!(request.class_level, None);
        assert_eq!(request.latest_message(), "Привет");
        Ok(())
    }

    #[test]
    fn user_type_is_permissive() -> anyhow::Result<()> {
        let preschooler = with_messages(json!({ "userType": "PRESCHOOLER" }));
        assert_eq!(
            ChatRequest::from_value(&preschooler)?.user_type,
            UserType::Preschooler
        );

        for user_type in [json!("ADMIN"), json!(7), json!(null)] {
            let payload = with_messages(json!({ "userType": user_type }));
            assert_eq!(ChatRequest::from_value(&payload)?.user_type, UserType::Schooler);
        }
        Ok(())
    }

    #[test]
    fn rejects_bad_envelopes() {
        let cases = [
            (json!([]), ValidationError::NotAnObject),
            (json!({}), ValidationError::MissingMessages),
            (json!({ "messages": [] }), ValidationError::MissingMessages),
            (json!({ "messages": "hi" }), ValidationError::MissingMessages),
            (json!({ "messages": [1] }), ValidationError::MessageNotAnObject(0)),
            (
                json!({ "messages": [{ "role": "system", "content": "x" }] }),
                ValidationError::InvalidRole(0),
            ),
            (
                json!({ "messages": [{ "role": "user", "content": "   " }] }),
                ValidationError::InvalidContent(0),
            ),
            (
                json!({ "messages": [{ "role": "user", "content": "\u{1}\u{2}" }] }),
                ValidationError::InvalidContent(0),
            ),
            (
                json!({ "messages": [{ "role": "user" }] }),
                ValidationError::InvalidContent(0),
            ),
        ];

        for (payload, expected) in cases {
            assert_eq!(ChatRequest::from_value(&payload), Err(expected), "{payload}");
        }
    }

    #[test]
    fn message_count_is_bounded() {
        let turn = json!({ "role": "user", "content": "x" });
        let ok = json!({ "messages": vec![turn.clone(); MAX_MESSAGES] });
        let too_many = json!({ "messages": vec![turn; MAX_MESSAGES + 1] });

        assert!(ChatRequest::from_value(&ok).is_ok());
        assert_eq!(
            ChatRequest::from_value(&too_many),
            Err(ValidationError::TooManyMessages)
        );
    }

    #[test]
    fn content_is_sanitized_and_truncated() -> anyhow::Result<()> {
        let long = format!("  {}\u{0}  ", "ы".repeat(MAX_CONTENT_CHARS + 10));
        let payload = json!({ "messages": [{ "role": "assistant", "content": long }] });
        let request = ChatRequest::from_value(&payload)?;

        assert_eq!(request.messages[0].role, TurnRole::Assistant);
        assert_eq!(request.messages[0].content.chars().count(), MAX_CONTENT_CHARS);
        assert!(!request.messages[0].content.contains('\u{0}'));
        Ok(())
    }

    #[test]
    fn subject_blank_is_rejected() {
        for subject in [json!(""), json!("   "), json!("\u{7f}"), json!(42)] {
            let payload = with_messages(json!({ "subject": subject }));
            assert_eq!(
                ChatRequest::from_value(&payload),
                Err(ValidationError::InvalidSubject)
            );
        }
    }

    #[test]
    fn null_fields_take_defaults() -> anyhow::Result<()> {
        let payload = with_messages(json!({
            "subject": null,
            "mode": null,
            "userType": null,
            "classLevel": null,
        }));
        let request = ChatRequest::from_value(&payload)?;

        assert_eq!(request.subject, DEFAULT_SUBJECT);
        assert_eq!(request.mode, DEFAULT_MODE);
        assert_eq!(request.user_type, UserType::Schooler);
        assert_eq!(request.class_level, None);
        Ok(())
    }

    #[test]
    fn subject_and_mode_are_bounded() -> anyhow::Result<()> {
        let payload = with_messages(json!({
            "subject": "м".repeat(300),
            "mode": "р".repeat(300),
        }));
        let request = ChatRequest::from_value(&payload)?;

        assert_eq!(request.subject.chars().count(), MAX_SUBJECT_CHARS);
        assert_eq!(request.mode.chars().count(), MAX_MODE_CHARS);

        let empty_mode = with_messages(json!({ "mode": "" }));
        assert_eq!(ChatRequest::from_value(&empty_mode)?.mode, "");

        let bad_mode = with_messages(json!({ "mode": [] }));
        assert_eq!(
            ChatRequest::from_value(&bad_mode),
            Err(ValidationError::InvalidMode)
        );
        Ok(())
    }

    #[test]
    fn class_level_bounds() -> anyhow::Result<()> {
        for level in [json!(1), json!(11), json!(5.0)] {
            let payload = with_messages(json!({ "classLevel": level }));
            assert!(ChatRequest::from_value(&payload)?.class_level.is_some());
        }

        let null_level = with_messages(json!({ "classLevel": null }));
        assert_eq!(ChatRequest::from_value(&null_level)?.class_level, None);

        for level in [
            json!(0),
            json!(12),
            json!(15),
            json!(-3),
            json!(5.5),
            json!("5"),
            json!(true),
            json!(1e300),
        ] {
            let payload = with_messages(json!({ "classLevel": level }));
            assert_eq!(
                ChatRequest::from_value(&payload),
                Err(ValidationError::InvalidClassLevel),
                "{level}"
            );
        }
        Ok(())
    }

    #[test]
    fn history_preserves_order() -> anyhow::Result<()> {
        let payload = json!({ "messages": [
            { "role": "user", "content": "1" },
            { "role": "assistant", "content": "2" },
            { "role": "user", "content": "3" },
        ]});
        let request = ChatRequest::from_value(&payload)?;
        let history: Vec<_> = request.history().collect();

        assert_eq!(history[0], ChatMessage::user("1"));
        assert_eq!(history[1], ChatMessage::assistant("2"));
        assert_eq!(history[2], ChatMessage::user("3"));
        Ok(())
    }
}
