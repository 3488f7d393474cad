//! Ordered provider fallback.
//!
//! Providers are tried strictly in configured order, one at a time. The
//! first success wins and nothing after it is called. A failure of any kind,
//! retriable or not, moves on to the next provider; the chain only gives up
//! once every provider has failed, returning each failure in order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::cache::CachedCompletion;
use crate::observe::{Absorption, AbsorptionObserver, TracingObserver};
use crate::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCause, ProviderError, TokenUsage,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("fallback chain needs at least one provider")]
    Empty,
}

/// Every provider failed. Attempts are in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackExhausted {
    pub attempts: Vec<ProviderError>,
}

impl fmt::Display for FallbackExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all {} providers failed", self.attempts.len())?;
        for (i, attempt) in self.attempts.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{attempt}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FallbackExhausted {}

/// Successful chain completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainCompletion {
    pub content: String,

    /// Provider that answered
    pub provider_id: String,

    pub model: String,

    pub usage: TokenUsage,

    /// Failures of the providers tried before the one that answered
    pub failed_attempts: Vec<ProviderError>,

    /// Served from the completion cache without any provider call
    pub cached: bool,
}

impl ChainCompletion {
    pub(crate) fn from_cache(hit: CachedCompletion) -> Self {
        Self {
            content: hit.content,
            provider_id: hit.provider_id,
            model: String::new(),
            usage: TokenUsage::default(),
            failed_attempts: Vec::new(),
            cached: true,
        }
    }
}

/// Health of one provider in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub id: String,
    pub ready: bool,
}

/// Fixed-order list of providers.
pub struct FallbackChain {
    providers: Vec<Arc<dyn LlmProvider>>,

    /// Stage name attached to absorption events
    label: Option<String>,

    observer: Arc<dyn AbsorptionObserver>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Result<Self, ChainError> {
        if providers.is_empty() {
            return Err(ChainError::Empty);
        }
        Ok(Self {
            providers,
            label: None,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AbsorptionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Provider ids in priority order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Health check of every provider, in priority order.
    pub async fn health(&self) -> Vec<ProviderHealth> {
        let mut report = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            report.push(ProviderHealth {
                id: provider.id().to_string(),
                ready: provider.health_check().await,
            });
        }
        report
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Complete `request` with the first provider that succeeds.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChainCompletion, FallbackExhausted> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match self.attempt(provider.as_ref(), request).await {
                Ok(response) => {
                    if !failures.is_empty() {
                        tracing::info!(
                            stage = ?self.label,
                            provider = %provider.id(),
                            failed = failures.len(),
                            "Recovered on fallback provider"
                        );
                    }
                    return Ok(ChainCompletion {
                        content: response.content,
                        provider_id: provider.id().to_string(),
                        model: response.model,
                        usage: response.usage,
                        failed_attempts: failures,
                        cached: false,
                    });
                }
                Err(e) => {
                    self.observer.absorbed(Absorption::provider_failed(
                        self.label.as_deref(),
                        provider.id(),
                        &e.cause,
                    ));
                    failures.push(e);
                }
            }
        }

        Err(FallbackExhausted { attempts: failures })
    }

    /// One bounded call, with the budget clamped to the provider's ceiling.
    async fn attempt(
        &self,
        provider: &dyn LlmProvider,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let budget = request.max_tokens_within(provider.max_tokens());
        let clamped;
        let request = if budget == request.max_tokens {
            request
        } else {
            clamped = CompletionRequest::new(request.prompt.clone(), budget);
            &clamped
        };

        let timeout = provider.timeout();
        tracing::debug!(stage = ?self.label, provider = %provider.id(), max_tokens = budget, "Calling provider");
        match tokio::time::timeout(timeout, provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(provider.id(), ProviderCause::Timeout(timeout))),
        }
    }
}

impl fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackChain")
            .field("providers", &self.provider_ids())
            .field("label", &self.label)
            .finish()
    }
}
