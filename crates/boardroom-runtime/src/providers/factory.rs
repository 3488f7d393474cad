//! Provider factory pattern for building providers from configuration.
//!
//! Each [`ProviderKind`](super::ProviderKind) has a factory registered under
//! its name. The registry resolves a [`ProviderConfig`] to a live provider,
//! loading the credential from the environment variable the config names.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create(&config)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ApiCredential, LlmProvider, ProviderCause, ProviderConfig, ProviderError};

/// Factory for creating LLM providers of one kind.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, matching `ProviderKind::as_str`.
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance.
    fn create(
        &self,
        config: &ProviderConfig,
        credential: ApiCredential,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate configuration without creating a provider.
    fn validate_config(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        let invalid = |msg: String| {
            Err(ProviderError::new(
                config.id.as_str(),
                ProviderCause::NotConfigured(msg),
            ))
        };
        if !config.endpoint.starts_with("http://") && !config.endpoint.starts_with("https://") {
            return invalid("endpoint must start with http:// or https://".to_string());
        }
        if config.model.trim().is_empty() {
            return invalid("model must not be empty".to_string());
        }
        if config.max_tokens == 0 {
            return invalid("max_tokens must be at least 1".to_string());
        }
        Ok(())
    }

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "LLM Provider"
    }
}

/// Registry of available provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    fn factory_for(&self, config: &ProviderConfig) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(config.kind.as_str()).ok_or_else(|| {
            ProviderError::new(
                config.id.as_str(),
                ProviderCause::NotConfigured(format!(
                    "Unknown provider type: '{}'. Available: {:?}",
                    config.kind,
                    self.available_types()
                )),
            )
        })
    }

    /// Create a provider, loading its credential from the environment.
    pub fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory_for(config)?;
        factory.validate_config(config)?;
        let credential = ApiCredential::from_env(&config.id, &config.api_key_env)?;
        factory.create(config, credential)
    }

    /// Create a provider with an explicit credential.
    pub fn create_with_credential(
        &self,
        config: &ProviderConfig,
        credential: ApiCredential,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory_for(config)?;
        factory.validate_config(config)?;
        factory.create(config, credential)
    }

    /// Validate configuration for a provider.
    pub fn validate(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        self.factory_for(config)?.validate_config(config)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider type is registered.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Create a registry with all built-in providers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::OpenAiChatProviderFactory));
        registry.register(Arc::new(super::HuggingFaceProviderFactory));
        registry.register(Arc::new(super::AnthropicProviderFactory));
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
