//! Gateway client configuration.

use std::fmt;
use std::time::Duration;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default values for configuration options.
mod defaults {
    use url::Url;

    /// Default completion endpoint.
    pub const ENDPOINT: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

    /// Default model identifier.
    pub const MODEL: &str = "google/gemini-3-flash-preview";

    /// Default connect timeout in seconds.
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Default timeout in seconds for response headers.
    pub const RESPONSE_TIMEOUT_SECS: u64 = 30;

    /// Default timeout in seconds between two body chunks.
    pub const IDLE_TIMEOUT_SECS: u64 = 60;

    pub fn endpoint() -> Url {
        Url::parse(ENDPOINT).expect("default gateway endpoint is a valid URL")
    }

    pub fn model() -> String {
        MODEL.to_owned()
    }

    pub fn connect_timeout_secs() -> u64 {
        CONNECT_TIMEOUT_SECS
    }

    pub fn response_timeout_secs() -> u64 {
        RESPONSE_TIMEOUT_SECS
    }

    pub fn idle_timeout_secs() -> u64 {
        IDLE_TIMEOUT_SECS
    }
}

/// Configuration for the completion gateway client.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct GatewayConfig {
    /// Streaming chat-completion endpoint.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            id = "gateway_endpoint",
            long = "llm-gateway-url",
            env = "LLM_GATEWAY_URL",
            default_value = "https://ai.gateway.lovable.dev/v1/chat/completions"
        )
    )]
    #[serde(default = "defaults::endpoint")]
    pub endpoint: Url,

    /// Bearer credential for the gateway.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            id = "gateway_api_key",
            long = "llm-gateway-api-key",
            env = "LLM_GATEWAY_API_KEY",
            hide_env_values = true
        )
    )]
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            long = "llm-model",
            env = "LLM_MODEL",
            default_value = "google/gemini-3-flash-preview"
        )
    )]
    #[serde(default = "defaults::model")]
    pub model: String,

    /// TCP/TLS connect timeout in seconds.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long = "llm-connect-timeout", env = "LLM_CONNECT_TIMEOUT", default_value = "10")
    )]
    #[serde(default = "defaults::connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Time in seconds allowed for the gateway to send response headers.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long = "llm-response-timeout", env = "LLM_RESPONSE_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "defaults::response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Time in seconds allowed between two chunks of the streamed body.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long = "llm-idle-timeout", env = "LLM_IDLE_TIMEOUT", default_value = "60")
    )]
    #[serde(default = "defaults::idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            api_key: None,
            model: defaults::model(),
            connect_timeout_secs: defaults::CONNECT_TIMEOUT_SECS,
            response_timeout_secs: defaults::RESPONSE_TIMEOUT_SECS,
            idle_timeout_secs: defaults::IDLE_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("response_timeout_secs", &self.response_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .finish()
    }
}

impl GatewayConfig {
    /// Returns `true` if a non-empty API key is present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }

    /// Returns the connect timeout, using the default if zero.
    pub fn connect_timeout(&self) -> Duration {
        non_zero_secs(self.connect_timeout_secs, defaults::CONNECT_TIMEOUT_SECS)
    }

    /// Returns the response-headers timeout, using the default if zero.
    pub fn response_timeout(&self) -> Duration {
        non_zero_secs(self.response_timeout_secs, defaults::RESPONSE_TIMEOUT_SECS)
    }

    /// Returns the idle timeout between body chunks, using the default if zero.
    pub fn idle_timeout(&self) -> Duration {
        non_zero_secs(self.idle_timeout_secs, defaults::IDLE_TIMEOUT_SECS)
    }

    /// Sets the completion endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the idle timeout in seconds.
    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Sets the response-headers timeout in seconds.
    pub fn with_response_timeout(mut self, secs: u64) -> Self {
        self.response_timeout_secs = secs;
        self
    }
}

fn non_zero_secs(secs: u64, fallback: u64) -> Duration {
    Duration::from_secs(if secs == 0 { fallback } else { secs })
}
