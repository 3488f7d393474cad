//! Completion cache.
//!
//! Identical prompts with the same token budget reuse an earlier validated
//! answer instead of calling any provider. Entries expire by TTL and
//! capacity.

use moka::future::Cache;
use std::time::Duration;

use crate::providers::CompletionRequest;

/// Cache key for one completion request. Holds the full prompt so two
/// prompts can never share an entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prompt: String,
    max_tokens: u32,
}

impl CacheKey {
    pub fn new(request: &CompletionRequest) -> Self {
        Self {
            prompt: request.prompt.clone(),
            max_tokens: request.max_tokens,
        }
    }
}

/// A completion that passed its stage's schema.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedCompletion {
    pub content: String,
    pub provider_id: String,
}

/// Completion cache using moka.
pub struct CompletionCache {
    cache: Cache<CacheKey, CachedCompletion>,
}

impl CompletionCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, request: &CompletionRequest) -> Option<CachedCompletion> {
        self.cache.get(&CacheKey::new(request)).await
    }

    pub async fn insert(&self, request: &CompletionRequest, completion: CachedCompletion) {
        self.cache.insert(CacheKey::new(request), completion).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new(1_000, Duration::from_secs(3600))
    }
}

impl std::fmt::Debug for CompletionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
