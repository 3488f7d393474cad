//! OpenAI-compatible chat completions provider.
//!
//! Serves every backend speaking `POST {endpoint}/chat/completions` with
//! bearer auth, which includes Cerebras and ASI:One.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::ProviderFactory, http_client, request_error, secrets::ApiCredential, status_error,
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, ProviderCause,
    ProviderConfig, ProviderError, TokenUsage,
};

pub struct OpenAiChatProvider {
    config: ProviderConfig,
    credential: ApiCredential,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatProvider")
            .field("id", &self.config.id)
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .field("credential", &self.credential)
            .finish()
    }
}

impl OpenAiChatProvider {
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
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiChatProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let id = self.config.id.as_str();
        let body = ChatRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens_within(self.config.max_tokens),
            messages: vec![ChatMessage::user(request.prompt.as_str())],
        };

        let response = self
            .client
            .post(self.config.url("chat/completions"))
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(id, e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(id, response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(id, ProviderCause::Decode(e.to_string())))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::new(id, ProviderCause::EmptyContent))?;

        Ok(CompletionResponse {
            content,
            usage: body
                .usage
                .map(|u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
            model: body.model.unwrap_or_else(|| self.config.model.clone()),
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

/// Factory for OpenAI-compatible chat providers.
pub struct OpenAiChatProviderFactory;

impl ProviderFactory for OpenAiChatProviderFactory {
    fn provider_type(&self) -> &'static str {
        "openai_chat"
    }

    fn create(
        &self,
        config: &ProviderConfig,
        credential: ApiCredential,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(OpenAiChatProvider::new(config.clone(), credential)?))
    }

    fn description(&self) -> &'static str {
        "OpenAI-compatible chat completions (Cerebras, ASI:One)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CredentialSource, ProviderKind};

    fn provider(secret: &str) -> OpenAiChatProvider {
        let config = ProviderConfig::new(
            "asi-one",
            ProviderKind::OpenaiChat,
            "https://api.asi1.ai/v1",
            "asi1-mini",
            "ASI_ONE_API_KEY",
        );
        let credential = ApiCredential::new(secret, CredentialSource::Programmatic, "ASI:One API key");
        OpenAiChatProvider::new(config, credential).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "asi1-mini",
            max_tokens: 1000,
            messages: vec![ChatMessage::user("hello")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "asi1-mini",
                "max_tokens": 1000,
                "messages": [{"role": "user", "content": "hello"}]
            })
        );
    }

    #[test]
    fn test_response_without_usage_decodes() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("{\"a\":1}"));
        assert!(body.usage.is_none());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "sk-asi-super-secret-12345";
        let debug = format!("{:?}", provider(secret));
        assert!(!debug.contains(secret), "API key was exposed in Debug output!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_tracks_credential() {
        assert!(provider("key").health_check().await);
        assert!(!provider("").health_check().await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retriable() {
        let config = ProviderConfig::new(
            "local",
            ProviderKind::OpenaiChat,
            "http://127.0.0.1:9",
            "m",
            "UNUSED",
        )
        .with_timeout(Duration::from_secs(2));
        let credential = ApiCredential::new("k", CredentialSource::Programmatic, "k");
        let provider = OpenAiChatProvider::new(config, credential).unwrap();

        let err = provider
            .complete(&CompletionRequest::new("hi", 10))
            .await
            .unwrap_err();
        assert_eq!(err.provider_id, "local");
        assert!(err.retriable);
    }
}
