#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod decoder;
mod error;
mod request;
mod stream;

pub use crate::client::{GatewayClient, GatewayStream};
pub use crate::config::GatewayConfig;
pub use crate::decoder::{EventDecoder, Frame};
pub use crate::error::{Error, Result};
pub use crate::request::{ChatMessage, CompletionRequest, Role};
pub use crate::stream::{DeltaStream, StreamState};

/// Tracing target for gateway client operations.
pub const TRACING_TARGET_CLIENT: &str = "repetitor_gateway::client";

/// Tracing target for event-stream framing.
pub const TRACING_TARGET_DECODER: &str = "repetitor_gateway::decoder";
