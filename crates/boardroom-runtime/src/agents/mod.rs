//! Stage agents.
//!
//! A [`StageSpec`] says what a stage asks for and what it accepts: the
//! prompt, the token budget, the schema and the static fallback. A
//! [`StageAgent`] runs a spec against a [`FallbackChain`] and always returns
//! a schema-valid [`StageResult`](boardroom_core::StageResult).

mod agent;

pub use agent::{StageAgent, StageFailure};

use serde_json::Value;
use std::sync::Arc;

use boardroom_core::{KnowledgeStore, StageInput, StageKind, ValidationError};

use crate::observe::{AbsorptionObserver, TracingObserver};
use crate::prompts;
use crate::providers::LlmProvider;
use crate::resilience::{ChainError, CompletionCache, FallbackChain};

/// What one stage asks the provider for and what it accepts back.
pub trait StageSpec: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Prompt text. Must be a pure function of `input`.
    fn render_prompt(&self, input: &StageInput) -> String;

    fn token_budget(&self) -> u32 {
        self.kind().token_budget()
    }

    /// Coerce and check extracted output against the stage schema.
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.kind().validate(value)
    }

    fn fallback(&self) -> Value {
        self.kind().fallback()
    }
}

/// Stage whose prompt depends only on the user input and upstream outputs.
#[derive(Debug, Clone, Copy)]
pub struct PromptSpec {
    kind: StageKind,
}

impl PromptSpec {
    pub fn new(kind: StageKind) -> Self {
        Self { kind }
    }
}

impl StageSpec for PromptSpec {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn render_prompt(&self, input: &StageInput) -> String {
        prompts::render(self.kind, input)
    }
}

/// Research stage: the prompt carries knowledge-store facts.
pub struct ResearchSpec {
    store: Arc<dyn KnowledgeStore>,
}

impl ResearchSpec {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn KnowledgeStore {
        self.store.as_ref()
    }
}

impl StageSpec for ResearchSpec {
    fn kind(&self) -> StageKind {
        StageKind::Research
    }

    fn render_prompt(&self, input: &StageInput) -> String {
        let profile = prompts::profile_of(input);
        let facts = profile.gather(self.store.as_ref());
        prompts::research(input, &profile, &facts)
    }
}

/// Builds stage agents that share one provider list.
///
/// Providers, cache and observer are shared; each agent gets its own chain
/// (labelled with the stage name) and its own usage counters.
pub struct AgentFactory {
    providers: Vec<Arc<dyn LlmProvider>>,
    store: Arc<dyn KnowledgeStore>,
    observer: Arc<dyn AbsorptionObserver>,
    cache: Option<Arc<CompletionCache>>,
}

impl AgentFactory {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            providers,
            store,
            observer: Arc::new(TracingObserver),
            cache: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AbsorptionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cache(mut self, cache: Arc<CompletionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn spec(&self, kind: StageKind) -> Arc<dyn StageSpec> {
        match kind {
            StageKind::Research => Arc::new(ResearchSpec::new(Arc::clone(&self.store))),
            other => Arc::new(PromptSpec::new(other)),
        }
    }

    pub fn build(&self, kind: StageKind) -> Result<StageAgent, ChainError> {
        let chain = FallbackChain::new(self.providers.clone())?
            .with_label(kind.name())
            .with_observer(Arc::clone(&self.observer));
        let mut agent = StageAgent::new(self.spec(kind), chain).with_observer(Arc::clone(&self.observer));
        if let Some(cache) = &self.cache {
            agent = agent.with_cache(Arc::clone(cache));
        }
        Ok(agent)
    }

    /// Knowledge store handed to research agents.
    pub fn store(&self) -> Arc<dyn KnowledgeStore> {
        Arc::clone(&self.store)
    }
}
