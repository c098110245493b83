#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod conversation;
mod error;
mod options;

pub use repetitor_gateway::{ChatMessage, Role};

pub use crate::client::{RelayClient, RelayStream};
pub use crate::conversation::{Conversation, Entry};
pub use crate::error::{Error, Result};
pub use crate::options::ChatOptions;

/// Tracing target for relay client operations.
pub const TRACING_TARGET_CLIENT: &str = "repetitor_client::client";
