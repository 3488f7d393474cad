//! Resilience patterns for boardroom-runtime.
//!
//! This module provides:
//! - Ordered provider fallback with per-attempt timeouts
//! - Completion caching
//! - Usage accounting

mod cache;
mod chain;
mod usage;

pub use cache::{CacheKey, CachedCompletion, CompletionCache};
pub use chain::{ChainCompletion, ChainError, FallbackChain, FallbackExhausted, ProviderHealth};
pub use usage::{LlmUsage, UsageTracker};
