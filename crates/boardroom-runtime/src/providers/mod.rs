//! LLM provider abstractions for boardroom-runtime.
//!
//! A provider performs exactly one request against one LLM backend and
//! normalizes the outcome into [`CompletionResponse`] or [`ProviderError`].
//! Providers never retry; moving on to the next backend is the job of the
//! [`FallbackChain`](crate::resilience::FallbackChain).
//!
//! Implementations:
//! - [`OpenAiChatProvider`]: OpenAI-compatible chat completions (Cerebras, ASI:One)
//! - [`HuggingFaceProvider`]: Hugging Face text-generation inference
//! - [`AnthropicProvider`]: Anthropic messages API
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod anthropic;
mod factory;
mod huggingface;
mod openai;
pub mod secrets;

pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};
pub use factory::{ProviderFactory, ProviderRegistry};
pub use huggingface::{HuggingFaceProvider, HuggingFaceProviderFactory};
pub use openai::{OpenAiChatProvider, OpenAiChatProviderFactory};
pub use secrets::{ApiCredential, CredentialSource};

use crate::config::duration_str;

/// Why one provider call failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderCause {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("authentication rejected with status {0}")]
    Unauthorized(u16),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("provider returned no content")]
    EmptyContent,

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderCause {
    /// Only credential problems are permanent.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            ProviderCause::Unauthorized(_) | ProviderCause::NotConfigured(_)
        )
    }
}

/// One provider call failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("provider '{provider_id}' failed: {cause}")]
pub struct ProviderError {
    pub provider_id: String,
    pub cause: ProviderCause,
    pub retriable: bool,
}

impl ProviderError {
    pub fn new(provider_id: impl Into<String>, cause: ProviderCause) -> Self {
        Self {
            provider_id: provider_id.into(),
            retriable: cause.is_retriable(),
            cause,
        }
    }
}

/// Prompt and output budget for one completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompletionRequest {
    pub prompt: String,

    /// Maximum tokens to generate, at least 1.
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: max_tokens.max(1),
        }
    }

    /// Token budget clamped to a provider's ceiling.
    pub fn max_tokens_within(&self, ceiling: u32) -> u32 {
        self.max_tokens.min(ceiling).max(1)
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated content, unvalidated
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model used
    pub model: String,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A chat message for chat-style APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API shape a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiChat,
    Anthropic,
    Huggingface,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenaiChat => "openai_chat",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Huggingface => "huggingface",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one provider. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in logs and errors (e.g., "cerebras")
    pub id: String,

    pub kind: ProviderKind,

    /// API base URL
    pub endpoint: String,

    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request timeout
    #[serde(with = "duration_str", default = "default_timeout")]
    pub timeout: Duration,

    /// Ceiling on requested output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_tokens() -> u32 {
    4096
}

impl ProviderConfig {
    pub fn new(
        id: impl Into<String>,
        kind: ProviderKind,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key_env: api_key_env.into(),
            timeout: default_timeout(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Endpoint joined with a path, without doubled slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// # Contract
/// One call, one request. Implementations must not retry internally and
/// must bound every request by [`timeout`](LlmProvider::timeout).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute one completion.
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Whether the provider can take requests (credential present).
    /// Reported per provider by a stage agent's `/health`.
    async fn health_check(&self) -> bool;

    /// Provider identifier for logs and errors.
    fn id(&self) -> &str;

    /// Upper bound on one request.
    fn timeout(&self) -> Duration;

    /// Ceiling on requested output tokens.
    fn max_tokens(&self) -> u32 {
        u32::MAX
    }
}

/// Shared HTTP client for provider calls.
pub(crate) fn http_client(provider_id: &str, timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::new(provider_id, ProviderCause::Http(e.to_string())))
}

/// Map a transport-level reqwest failure.
pub(crate) fn request_error(provider_id: &str, err: reqwest::Error, timeout: Duration) -> ProviderError {
    let cause = if err.is_timeout() {
        ProviderCause::Timeout(timeout)
    } else if err.is_decode() {
        ProviderCause::Decode(err.to_string())
    } else {
        ProviderCause::Http(err.to_string())
    };
    ProviderError::new(provider_id, cause)
}

/// Map a non-2xx response, consuming its body for the message.
pub(crate) async fn status_error(provider_id: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    if status == 401 || status == 403 {
        return ProviderError::new(provider_id, ProviderCause::Unauthorized(status));
    }
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return ProviderError::new(provider_id, ProviderCause::RateLimited { retry_after });
    }
    let message: String = response.text().await.unwrap_or_default().chars().take(500).collect();
    ProviderError::new(provider_id, ProviderCause::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_credential_failures_are_permanent() {
        assert!(!ProviderError::new("a", ProviderCause::Unauthorized(401)).retriable);
        assert!(!ProviderError::new("a", ProviderCause::NotConfigured("key".into())).retriable);
        assert!(ProviderError::new("a", ProviderCause::Status { status: 500, message: String::new() }).retriable);
        assert!(ProviderError::new("a", ProviderCause::Timeout(Duration::from_secs(1))).retriable);
        assert!(ProviderError::new("a", ProviderCause::RateLimited { retry_after: None }).retriable);
        assert!(ProviderError::new("a", ProviderCause::EmptyContent).retriable);
    }

    #[test]
    fn test_request_budget_is_at_least_one_and_clamped() {
        let request = CompletionRequest::new("hi", 0);
        assert_eq!(request.max_tokens, 1);

        let request = CompletionRequest::new("hi", 4000);
        assert_eq!(request.max_tokens_within(2048), 2048);
        assert_eq!(request.max_tokens_within(8192), 4000);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_provider_url_join() {
        let config = ProviderConfig::new(
            "asi-one",
            ProviderKind::OpenaiChat,
            "https://api.asi1.ai/v1/",
            "asi1-mini",
            "ASI_ONE_API_KEY",
        );
        assert_eq!(config.url("/chat/completions"), "https://api.asi1.ai/v1/chat/completions");
    }

    #[test]
    fn test_provider_config_yaml() {
        let yaml = r#"
id: cerebras
kind: openai_chat
endpoint: https://api.cerebras.ai/v1
model: llama-3.3-70b
api_key_env: CEREBRAS_API_KEY
timeout: 90s
max_tokens: 8192
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kind, ProviderKind::OpenaiChat);
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.max_tokens, 8192);
    }

    #[test]
    fn test_provider_config_defaults() {
        let yaml = r#"
id: meta-llama
kind: huggingface
endpoint: https://api-inference.huggingface.co
model: meta-llama/Llama-3.1-8B-Instruct
api_key_env: HUGGINGFACE_API_KEY
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn test_error_display_names_provider() {
        let err = ProviderError::new("cerebras", ProviderCause::Status { status: 500, message: "boom".into() });
        assert_eq!(err.to_string(), "provider 'cerebras' failed: API error: 500 - boom");
    }
}
