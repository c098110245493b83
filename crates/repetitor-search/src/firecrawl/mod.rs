//! Firecrawl search API client.

mod client;
mod config;

pub use client::FirecrawlClient;
pub use config::FirecrawlConfig;

pub(crate) use crate::TRACING_TARGET;
