//! LLM usage accounting for one stage agent.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::chain::{ChainCompletion, FallbackExhausted};
use crate::providers::TokenUsage;

/// Accumulated usage since the agent started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u64,

    /// Prompt/input tokens
    pub prompt_tokens: u64,

    /// Completion/output tokens
    pub completion_tokens: u64,

    /// Provider requests made, failed ones included
    pub llm_calls: u32,

    /// Provider requests that failed and moved the chain on
    pub provider_failures: u32,

    /// Completions served from the cache
    pub cache_hits: u32,

    /// Stage invocations
    pub stage_runs: u32,

    /// Stage invocations answered with the static fallback
    pub stage_fallbacks: u32,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.total_tokens += u64::from(usage.total());
    }
}

/// Thread-safe usage tracker shared by a stage agent's handlers.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completion(&self, completion: &ChainCompletion) {
        let mut usage = self.usage.write();
        if completion.cached {
            usage.cache_hits += 1;
            return;
        }
        let failures = completion.failed_attempts.len() as u32;
        usage.llm_calls += failures + 1;
        usage.provider_failures += failures;
        usage.add(&completion.usage);
    }

    pub fn record_exhausted(&self, exhausted: &FallbackExhausted) {
        let failures = exhausted.attempts.len() as u32;
        let mut usage = self.usage.write();
        usage.llm_calls += failures;
        usage.provider_failures += failures;
    }

    pub fn record_stage(&self, success: bool) {
        let mut usage = self.usage.write();
        usage.stage_runs += 1;
        if !success {
            usage.stage_fallbacks += 1;
        }
    }

    /// Get current usage.
    pub fn snapshot(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    pub fn reset(&self) {
        *self.usage.write() = LlmUsage::default();
    }
}
