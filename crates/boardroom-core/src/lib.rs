//! # boardroom-core
//!
//! Deterministic building blocks of the Boardroom agent pipeline.
//!
//! Nothing in this crate touches the network. It answers three questions
//! for the runtime:
//! - Is there a structured value in this provider text? ([`extract`])
//! - Does it satisfy the stage's schema, after relaxed coercion? ([`stages`])
//! - What has this run committed so far? ([`context`], [`run`])
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: extraction and validation are pure functions
//! 2. **Schema-complete fallbacks**: every stage's static fallback passes its
//!    own validation
//! 3. **Write-once context**: a stage commits output at most once per run
//!
//! ## Example
//!
//! ```rust,ignore
//! use boardroom_core::{extract, StageKind};
//!
//! let raw = "Sure! ```json\n{\"title\": \"TutorBot\", \"description\": \"...\"}\n```";
//! let value = extract(raw)?;
//! let concept = StageKind::Concept.validate(&value)?;
//! ```

pub mod coerce;
pub mod context;
pub mod extract;
pub mod knowledge;
pub mod run;
pub mod stages;

pub use coerce::{coerce_text, FieldReader, ValidationError};
pub use context::{ContextError, StageContext};
pub use extract::{extract, strip_control_chars, ExtractionError};
pub use knowledge::{BusinessProfile, Facts, KnowledgeStore, StaticKnowledgeStore};
pub use run::{PipelineRun, RunStatus, StageResult};
pub use stages::{InputError, StageInput, StageKind, StageOutput, UnknownStage};
