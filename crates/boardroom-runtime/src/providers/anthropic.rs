//! Anthropic Claude provider implementation.
//!
//! ## Security
//!
//! This provider uses the centralized [`ApiCredential`] system for secure
//! credential handling. See the [`secrets`](super::secrets) module for details.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::ProviderFactory, http_client, request_error, secrets::ApiCredential, status_error,
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCause, ProviderConfig,
    ProviderError, TokenUsage,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    config: ProviderConfig,
    credential: ApiCredential,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("id", &self.config.id)
            .field("credential", &self.credential)
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig, credential: ApiCredential) -> Result<Self, ProviderError> {
        let client = http_client(&config.id, config.timeout)?;
        Ok(Self {
            config,
            credential,
            client,
        })
    }
}

/// Anthropic API request format.
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic API response format.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlockResponse>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlockResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let id = self.config.id.as_str();
        let body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens_within(self.config.max_tokens),
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.config.url("messages"))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(id, e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(id, response).await);
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(id, ProviderCause::Decode(e.to_string())))?;

        let content = body
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(ProviderError::new(id, ProviderCause::EmptyContent));
        }

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: body.usage.input_tokens,
                completion_tokens: body.usage.output_tokens,
            },
            model: body.model,
        })
    }

    async fn health_check(&self) -> bool {
        // Verify the key is set without logging it
        !self.credential.is_empty()
    }

    fn id(&self) -> &str {
        &self.config.id
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn max_tokens(&self) -> u32 {
        self.config.max_tokens
    }
}

/// Factory for Anthropic providers.
pub struct AnthropicProviderFactory;

impl ProviderFactory for AnthropicProviderFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn create(
        &self,
        config: &ProviderConfig,
        credential: ApiCredential,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(AnthropicProvider::new(config.clone(), credential)?))
    }

    fn description(&self) -> &'static str {
        "Anthropic Claude messages API"
    }
}
