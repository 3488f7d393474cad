//! # boardroom-runtime
//!
//! Everything in the Boardroom pipeline that talks to the network.
//!
//! - [`providers`]: one client per LLM vendor behind [`LlmProvider`]
//! - [`resilience`]: the ordered [`FallbackChain`] over those providers
//! - [`agents`]: stage agents that turn a chain completion into a
//!   schema-valid stage result, or the stage's static fallback
//! - [`transport`]: the REST and message surfaces of a stage agent
//! - [`coordinator`]: sequential pipeline runs across stage agents
//!
//! ## Failure absorption
//!
//! Failures are absorbed at the lowest level that can still produce a
//! usable answer. A provider error moves the chain to the next provider.
//! An exhausted chain or unparseable answer gives the stage's fallback.
//! Only a stage that cannot be reached at all stops a run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use boardroom_runtime::{AgentFactory, Coordinator, PipelineConfig, ProviderRegistry};
//! use boardroom_core::{StageKind, StaticKnowledgeStore};
//!
//! let config = PipelineConfig::load(None)?;
//! let providers = config.build_providers(&ProviderRegistry::with_defaults())?;
//! let factory = AgentFactory::new(providers, Arc::new(StaticKnowledgeStore::seeded()));
//! let concept = factory.build(StageKind::Concept)?;
//!
//! let coordinator = Coordinator::builder().stages(config.endpoints()).build()?;
//! let report = coordinator.run("An AI tutor for high school students", None).await?;
//! ```

pub mod agents;
pub mod config;
pub mod coordinator;
pub mod observe;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod transport;

#[cfg(test)]
mod testing;

pub use agents::{AgentFactory, StageAgent, StageFailure, StageSpec};
pub use config::{CacheConfig, ConfigError, CoordinatorConfig, PipelineConfig, StageConfig};
pub use coordinator::{
    coordinator_router, Coordinator, CoordinatorBuilder, HttpStageTransport, PipelineReport,
    StageEndpoint, StageTransport, TransportError, WorkflowCause, WorkflowError,
};
pub use observe::{Absorption, AbsorptionKind, AbsorptionObserver, RecordingObserver, TracingObserver};
pub use providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCause, ProviderConfig,
    ProviderError, ProviderKind, ProviderRegistry,
};
pub use resilience::{
    ChainCompletion, CompletionCache, FallbackChain, FallbackExhausted, LlmUsage, ProviderHealth,
};
pub use transport::{serve, stage_router, Mailbox, StageHealth};
