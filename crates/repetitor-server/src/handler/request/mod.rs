//! Request types and validation for HTTP handlers.

mod chat;

pub use chat::{ChatRequest, ChatTurn, TurnRole, UserType, ValidationError};
