//! Hugging Face inference provider (text generation task).
//!
//! `POST {endpoint}/models/{model}` with `{inputs, parameters}`; the answer
//! is `[{generated_text}]` or, from some deployments, `{generated_text}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::ProviderFactory, http_client, request_error, secrets::ApiCredential, status_error,
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCause, ProviderConfig,
    ProviderError, TokenUsage,
};

pub struct HuggingFaceProvider {
    config: ProviderConfig,
    credential: ApiCredential,
    client: reqwest::Client,
}

impl std::fmt::Debug for HuggingFaceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceProvider")
            .field("id", &self.config.id)
            .field("model", &self.config.model)
            .field("credential", &self.credential)
            .finish()
    }
}

impl HuggingFaceProvider {
    pub fn new(config: ProviderConfig, credential: ApiCredential) -> Result<Self, ProviderError> {
        let client = http_client(&config.id, config.timeout)?;
        Ok(Self {
            config,
            credential,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<Generation>),
    Single(Generation),
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: Option<String>,
}

impl GenerationResponse {
    fn into_text(self) -> Option<String> {
        match self {
            GenerationResponse::Batch(items) => items.into_iter().next()?.generated_text,
            GenerationResponse::Single(item) => item.generated_text,
        }
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let id = self.config.id.as_str();
        let body = GenerationRequest {
            inputs: &request.prompt,
            parameters: GenerationParameters {
                max_new_tokens: request.max_tokens_within(self.config.max_tokens),
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(self.config.url(&format!("models/{}", self.config.model)))
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(id, e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(id, response).await);
        }

        let content = response
            .json::<GenerationResponse>()
            .await
            .map_err(|e| ProviderError::new(id, ProviderCause::Decode(e.to_string())))?
            .into_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::new(id, ProviderCause::EmptyContent))?;

        Ok(CompletionResponse {
            content,
            // The text-generation task does not report usage.
            usage: TokenUsage::default(),
            model: self.config.model.clone(),
        })
    }

    async fn health_check(&self) -> bool {
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

/// Factory for Hugging Face inference providers.
pub struct HuggingFaceProviderFactory;

impl ProviderFactory for HuggingFaceProviderFactory {
    fn provider_type(&self) -> &'static str {
        "huggingface"
    }

    fn create(
        &self,
        config: &ProviderConfig,
        credential: ApiCredential,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(HuggingFaceProvider::new(config.clone(), credential)?))
    }

    fn description(&self) -> &'static str {
        "Hugging Face text-generation inference (Meta Llama and others)"
    }
}
