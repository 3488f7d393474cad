//! The stage agent: prompt, fallback chain, extraction, validation.

use std::sync::Arc;
use thiserror::Error;

use boardroom_core::{
    extract, ExtractionError, InputError, StageInput, StageKind, StageResult, ValidationError,
};

use super::StageSpec;
use crate::observe::{Absorption, AbsorptionObserver, TracingObserver};
use crate::providers::CompletionRequest;
use crate::resilience::{
    CachedCompletion, ChainCompletion, CompletionCache, FallbackChain, FallbackExhausted, LlmUsage,
    UsageTracker,
};

/// Why a stage answered with its static fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageFailure {
    #[error(transparent)]
    Exhausted(#[from] FallbackExhausted),

    #[error("provider output is not structured data: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("provider output does not match the stage schema: {0}")]
    Validation(#[from] ValidationError),
}

/// One pipeline stage backed by a fallback chain.
///
/// # Contract
/// [`run`](StageAgent::run) never fails: it returns the validated stage
/// output with `success = true`, or the stage's static fallback with
/// `success = false`. Raw provider text never leaves the agent, and only
/// text that passed the stage schema is written to the completion cache.
pub struct StageAgent {
    spec: Arc<dyn StageSpec>,
    chain: FallbackChain,
    observer: Arc<dyn AbsorptionObserver>,
    usage: UsageTracker,
    cache: Option<Arc<CompletionCache>>,
}

impl StageAgent {
    pub fn new(spec: Arc<dyn StageSpec>, chain: FallbackChain) -> Self {
        Self {
            spec,
            chain,
            observer: Arc::new(TracingObserver),
            usage: UsageTracker::new(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CompletionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AbsorptionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn kind(&self) -> StageKind {
        self.spec.kind()
    }

    pub fn name(&self) -> &'static str {
        self.spec.kind().name()
    }

    pub fn spec(&self) -> &dyn StageSpec {
        self.spec.as_ref()
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }

    /// Entry point for every transport: rejects inputs no stage should run,
    /// before any provider is called.
    pub async fn handle(&self, input: &StageInput) -> Result<StageResult, InputError> {
        input.check()?;
        Ok(self.run(input).await)
    }

    /// Execute the stage. Always yields a schema-valid output.
    pub async fn run(&self, input: &StageInput) -> StageResult {
        let result = match self.produce(input).await {
            Ok(output) => {
                tracing::info!(stage = self.name(), "Stage produced output");
                StageResult::produced(self.name(), output)
            }
            Err(failure) => {
                self.observer
                    .absorbed(Absorption::stage_fallback(self.name(), &failure));
                StageResult::fallback(self.name(), self.spec.fallback())
            }
        };
        self.usage.record_stage(result.success);
        result
    }

    /// Steps that may fail: chain, extraction, validation.
    async fn produce(&self, input: &StageInput) -> Result<serde_json::Value, StageFailure> {
        let prompt = self.spec.render_prompt(input);
        let request = CompletionRequest::new(prompt, self.spec.token_budget());

        let completion = match self.cached(&request).await {
            Some(hit) => hit,
            None => match self.chain.complete(&request).await {
                Ok(completion) => completion,
                Err(exhausted) => {
                    self.usage.record_exhausted(&exhausted);
                    return Err(exhausted.into());
                }
            },
        };
        self.usage.record_completion(&completion);
        tracing::debug!(
            stage = self.name(),
            provider = %completion.provider_id,
            cached = completion.cached,
            "Completion received"
        );

        let value = extract(&completion.content)?;
        let output = self.spec.validate(&value)?;

        if let (Some(cache), false) = (&self.cache, completion.cached) {
            let entry = CachedCompletion {
                content: completion.content,
                provider_id: completion.provider_id,
            };
            cache.insert(&request, entry).await;
        }
        Ok(output)
    }

    async fn cached(&self, request: &CompletionRequest) -> Option<ChainCompletion> {
        let hit = self.cache.as_ref()?.get(request).await?;
        tracing::debug!(stage = self.name(), provider = %hit.provider_id, "Completion served from cache");
        Some(ChainCompletion::from_cache(hit))
    }
}

impl std::fmt::Debug for StageAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageAgent")
            .field("stage", &self.name())
            .field("chain", &self.chain)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::PromptSpec;
    use crate::observe::{AbsorptionKind, RecordingObserver};
    use crate::providers::ProviderCause;
    use crate::testing::{chain_of, ScriptedProvider};
    use serde_json::json;

    fn agent(kind: StageKind, providers: &[&Arc<ScriptedProvider>]) -> StageAgent {
        let chain = FallbackChain::new(chain_of(providers)).unwrap();
        StageAgent::new(Arc::new(PromptSpec::new(kind)), chain)
    }

    fn http_500(id: &str) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::failing(
            id,
            ProviderCause::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
            },
        ))
    }

    #[tokio::test]
    async fn test_wrapped_json_is_extracted_and_validated() {
        let provider = Arc::new(ScriptedProvider::answering(
            "cerebras",
            "Here is the concept:\n```json\n{\"title\": \"TutorBot\", \"description\": \"AI tutoring\"}\n```\nEnjoy!",
        ));
        let agent = agent(StageKind::Concept, &[&provider]);

        let result = agent.run(&StageInput::new("AI tutor")).await;

        assert!(result.success);
        assert_eq!(result.stage, "concept");
        assert_eq!(result.output["title"], "TutorBot");
        assert_eq!(result.output["success_factors"], json!([]));
        assert_eq!(provider.budgets(), vec![StageKind::Concept.token_budget()]);
    }

    #[tokio::test]
    async fn test_unparseable_text_yields_static_fallback() {
        let provider = Arc::new(ScriptedProvider::answering("cerebras", "not json at all"));
        let observer = Arc::new(RecordingObserver::new());
        let agent = agent(StageKind::Product, &[&provider]).with_observer(observer.clone());

        let result = agent.run(&StageInput::new("AI tutor")).await;

        assert!(!result.success);
        assert_eq!(result.output, StageKind::Product.fallback());
        assert_eq!(observer.count(AbsorptionKind::StageFallback), 1);
        assert!(observer.events()[0].cause.contains("not structured data"));
        assert_eq!(agent.usage().stage_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain_yields_static_fallback() {
        let a = http_500("cerebras");
        let b = http_500("asi-one");
        let agent = agent(StageKind::Finance, &[&a, &b]);

        let result = agent.run(&StageInput::new("AI tutor")).await;

        assert!(!result.success);
        assert_eq!(result.output, StageKind::Finance.fallback());
        assert_eq!((a.calls(), b.calls()), (1, 1));
        let usage = agent.usage();
        assert_eq!(usage.llm_calls, 2);
        assert_eq!(usage.provider_failures, 2);
    }

    #[tokio::test]
    async fn test_missing_required_field_yields_static_fallback() {
        let provider = Arc::new(ScriptedProvider::answering("cerebras", r#"{"description": "no title"}"#));
        let agent = agent(StageKind::Concept, &[&provider]);

        let result = agent.run(&StageInput::new("AI tutor")).await;

        assert!(!result.success);
        assert_eq!(result.output, StageKind::Concept.fallback());
    }

    #[tokio::test]
    async fn test_object_in_text_field_is_coerced() {
        let provider = Arc::new(ScriptedProvider::answering(
            "cerebras",
            r#"{"technology_stack": {"frontend": ["React"], "backend": ["Rust"], "database": {"primary": "Postgres"}},
                "architecture": {"overview": "Modular services"}}"#,
        ));
        let agent = agent(StageKind::Technical, &[&provider]);

        let result = agent.run(&StageInput::new("AI tutor")).await;

        assert!(result.success);
        assert_eq!(result.output["technology_stack"]["database"], r#"{"primary":"Postgres"}"#);
    }

    #[tokio::test]
    async fn test_validated_completion_is_served_from_cache() {
        let provider = Arc::new(ScriptedProvider::answering(
            "cerebras",
            r#"{"title": "TutorBot", "description": "AI tutoring"}"#,
        ));
        let agent = agent(StageKind::Concept, &[&provider]).with_cache(Arc::new(CompletionCache::default()));
        let input = StageInput::new("AI tutor");

        let first = agent.run(&input).await;
        let second = agent.run(&input).await;

        assert!(first.success && second.success);
        assert_eq!(first.output, second.output);
        assert_eq!(provider.calls(), 1);
        assert_eq!(agent.usage().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_rejected_completion_is_never_cached() {
        let cache = Arc::new(CompletionCache::default());
        let garbled = Arc::new(ScriptedProvider::answering("cerebras", "not json at all"));
        let incomplete = Arc::new(ScriptedProvider::answering("asi-one", r#"{"description": "no title"}"#));
        let input = StageInput::new("AI tutor");

        let agent_a = agent(StageKind::Concept, &[&garbled]).with_cache(Arc::clone(&cache));
        assert!(!agent_a.run(&input).await.success);
        assert!(!agent_a.run(&input).await.success);
        assert_eq!(garbled.calls(), 2);

        let agent_b = agent(StageKind::Concept, &[&incomplete]).with_cache(Arc::clone(&cache));
        assert!(!agent_b.run(&input).await.success);
        assert!(!agent_b.run(&input).await.success);
        assert_eq!(incomplete.calls(), 2);

        let request = CompletionRequest::new(
            agent_b.spec().render_prompt(&input),
            StageKind::Concept.token_budget(),
        );
        assert!(cache.get(&request).await.is_none());
        assert_eq!(agent_b.usage().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_fallback_output_always_satisfies_schema() {
        for kind in StageKind::ALL {
            let failing = http_500("only");
            let agent = agent(kind, &[&failing]);
            let result = agent.run(&StageInput::new("anything")).await;
            assert!(!result.success);
            assert_eq!(kind.validate(&result.output).unwrap(), result.output, "{kind}");
        }
    }
}
