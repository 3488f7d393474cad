//! Pipeline stages and their declared output schemas.
//!
//! Seven stages run in a fixed order. Each has a typed output built from
//! extracted provider output through [`FieldReader`](crate::coerce::FieldReader),
//! and a hand-authored static fallback that is schema-complete.
//!
//! | # | Stage | Path | Port | Tokens |
//! |---|-------|------|------|--------|
//! | 1 | concept | `/develop-concept` | 8001 | 1000 |
//! | 2 | research | `/research-idea` | 8002 | 3000 |
//! | 3 | product | `/develop-product` | 8003 | 3000 |
//! | 4 | marketing | `/develop-marketing` | 8004 | 3000 |
//! | 5 | technical | `/develop-technical` | 8005 | 4000 |
//! | 6 | engineering | `/create-site-brief` | 8006 | 4000 |
//! | 7 | finance | `/analyze-revenue` | 8007 | 2000 |

mod concept;
mod engineering;
mod finance;
mod marketing;
mod product;
mod research;
mod technical;

pub use concept::ConceptOutput;
pub use engineering::{
    ContentPlan, DesignSpecifications, EngineeringOutput, TechnicalSpecifications,
};
pub use finance::{FinanceOutput, RevenueProjection};
pub use marketing::{
    BudgetRecommendations, ContentStrategy, LaunchCampaign, MarketingChannel, MarketingOutput,
    SocialMedia, TargetSegment,
};
pub use product::{GoToMarket, ProductOutput, TargetMarket};
pub use research::{Competitor, MarketAnalysis, Recommendations, ResearchOutput};
pub use technical::{Architecture, Phase, TechnicalOutput, TechnologyStack, Timeline};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::coerce::{coerce_text, ValidationError};

/// The fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Concept,
    Research,
    Product,
    Marketing,
    Technical,
    Engineering,
    Finance,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown stage '{0}'")]
pub struct UnknownStage(pub String);

impl StageKind {
    /// All stages in pipeline order.
    pub const ALL: [StageKind; 7] = [
        StageKind::Concept,
        StageKind::Research,
        StageKind::Product,
        StageKind::Marketing,
        StageKind::Technical,
        StageKind::Engineering,
        StageKind::Finance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Concept => "concept",
            StageKind::Research => "research",
            StageKind::Product => "product",
            StageKind::Marketing => "marketing",
            StageKind::Technical => "technical",
            StageKind::Engineering => "engineering",
            StageKind::Finance => "finance",
        }
    }

    /// REST path the stage agent serves.
    pub fn path(&self) -> &'static str {
        match self {
            StageKind::Concept => "/develop-concept",
            StageKind::Research => "/research-idea",
            StageKind::Product => "/develop-product",
            StageKind::Marketing => "/develop-marketing",
            StageKind::Technical => "/develop-technical",
            StageKind::Engineering => "/create-site-brief",
            StageKind::Finance => "/analyze-revenue",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            StageKind::Concept => 8001,
            StageKind::Research => 8002,
            StageKind::Product => 8003,
            StageKind::Marketing => 8004,
            StageKind::Technical => 8005,
            StageKind::Engineering => 8006,
            StageKind::Finance => 8007,
        }
    }

    /// Max output tokens requested from providers.
    pub fn token_budget(&self) -> u32 {
        match self {
            StageKind::Concept => 1000,
            StageKind::Research | StageKind::Product | StageKind::Marketing => 3000,
            StageKind::Technical | StageKind::Engineering => 4000,
            StageKind::Finance => 2000,
        }
    }

    /// How long the coordinator waits for this stage by default.
    /// Stages with larger prompts or knowledge lookups get longer.
    pub fn default_timeout(&self) -> Duration {
        match self {
            StageKind::Research | StageKind::Technical | StageKind::Engineering => {
                Duration::from_secs(120)
            }
            StageKind::Concept | StageKind::Product | StageKind::Marketing | StageKind::Finance => {
                Duration::from_secs(90)
            }
        }
    }

    /// Upstream stages whose committed output this stage reads.
    pub fn inputs(&self) -> &'static [StageKind] {
        use StageKind::*;
        match self {
            Concept => &[],
            Research => &[Concept],
            Product => &[Concept, Research],
            Marketing | Technical => &[Concept, Product, Research],
            Engineering => &[Concept, Product, Research, Marketing, Technical],
            Finance => &[Concept, Product],
        }
    }

    /// Validate extracted output against this stage's schema.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        match self {
            StageKind::Concept => validated::<ConceptOutput>(value),
            StageKind::Research => validated::<ResearchOutput>(value),
            StageKind::Product => validated::<ProductOutput>(value),
            StageKind::Marketing => validated::<MarketingOutput>(value),
            StageKind::Technical => validated::<TechnicalOutput>(value),
            StageKind::Engineering => validated::<EngineeringOutput>(value),
            StageKind::Finance => validated::<FinanceOutput>(value),
        }
    }

    /// This stage's static fallback as JSON.
    pub fn fallback(&self) -> Value {
        match self {
            StageKind::Concept => fallback_value::<ConceptOutput>(),
            StageKind::Research => fallback_value::<ResearchOutput>(),
            StageKind::Product => fallback_value::<ProductOutput>(),
            StageKind::Marketing => fallback_value::<MarketingOutput>(),
            StageKind::Technical => fallback_value::<TechnicalOutput>(),
            StageKind::Engineering => fallback_value::<EngineeringOutput>(),
            StageKind::Finance => fallback_value::<FinanceOutput>(),
        }
    }
}

fn validated<T: StageOutput>(value: &Value) -> Result<Value, ValidationError> {
    T::from_value(value).map(|output| output.to_value())
}

fn fallback_value<T: StageOutput>() -> Value {
    T::fallback().to_value()
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StageKind {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Typed output of one stage.
pub trait StageOutput: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: StageKind;

    /// Build from extracted output, coercing relaxed fields.
    fn from_value(value: &Value) -> Result<Self, ValidationError>;

    /// Hand-authored output used when the stage cannot produce its own.
    fn fallback() -> Self;

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A stage input no agent will run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("user_input must not be empty")]
    EmptyUserInput,
}

/// Request body accepted by every stage agent.
///
/// `context` carries the committed output of each upstream stage the
/// stage reads, keyed by stage name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageInput {
    pub user_input: String,

    #[serde(default)]
    pub context: Map<String, Value>,
}

impl StageInput {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            context: Map::new(),
        }
    }

    /// Checks shared by every surface that accepts a stage input.
    pub fn check(&self) -> Result<(), InputError> {
        if self.user_input.trim().is_empty() {
            return Err(InputError::EmptyUserInput);
        }
        Ok(())
    }

    pub fn with_upstream(mut self, stage: impl Into<String>, output: Value) -> Self {
        self.context.insert(stage.into(), output);
        self
    }

    pub fn upstream(&self, stage: StageKind) -> Option<&Value> {
        self.context.get(stage.name())
    }

    /// One text field of an upstream output, empty when absent.
    pub fn upstream_text(&self, stage: StageKind, field: &str) -> String {
        self.upstream(stage)
            .and_then(|v| v.get(field))
            .and_then(coerce_text)
            .unwrap_or_default()
    }

    /// Pretty JSON of an upstream output for embedding in prompts.
    pub fn upstream_json(&self, stage: StageKind) -> String {
        self.upstream(stage)
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_order_and_lookup() {
        let names: Vec<_> = StageKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            vec!["concept", "research", "product", "marketing", "technical", "engineering", "finance"]
        );
        assert_eq!("Marketing".parse::<StageKind>().unwrap(), StageKind::Marketing);
        assert!("cfo".parse::<StageKind>().is_err());
    }

    #[test]
    fn test_heavy_stages_get_longer_timeouts() {
        for kind in [StageKind::Research, StageKind::Technical, StageKind::Engineering] {
            assert_eq!(kind.default_timeout(), Duration::from_secs(120), "{kind}");
        }
        for kind in [StageKind::Concept, StageKind::Product, StageKind::Marketing, StageKind::Finance] {
            assert_eq!(kind.default_timeout(), Duration::from_secs(90), "{kind}");
        }
    }

    #[test]
    fn test_inputs_only_reference_earlier_stages() {
        for kind in StageKind::ALL {
            for input in kind.inputs() {
                assert!(input < &kind, "{kind} reads {input}, which runs later");
            }
        }
    }

    #[test]
    fn test_fallbacks_satisfy_their_own_schema() {
        for kind in StageKind::ALL {
            let fallback = kind.fallback();
            let validated = kind
                .validate(&fallback)
                .unwrap_or_else(|e| panic!("{kind} fallback is incomplete: {e}"));
            assert_eq!(validated, fallback, "{kind} fallback changed under validation");
        }
    }

    #[test]
    fn test_empty_object_fails_every_schema() {
        for kind in StageKind::ALL {
            assert!(kind.validate(&json!({})).is_err(), "{kind} accepted {{}}");
        }
    }

    #[test]
    fn test_stage_input_upstream_access() {
        let input = StageInput::new("AI tutor for kids")
            .with_upstream("concept", json!({"title": "TutorBot", "score": 9}));
        assert_eq!(input.upstream_text(StageKind::Concept, "title"), "TutorBot");
        assert_eq!(input.upstream_text(StageKind::Concept, "score"), "9");
        assert_eq!(input.upstream_text(StageKind::Product, "product_name"), "");
        assert_eq!(input.upstream_json(StageKind::Research), "{}");
    }

    #[test]
    fn test_blank_user_input_fails_the_check() {
        assert_eq!(StageInput::new(" \n\t").check(), Err(InputError::EmptyUserInput));
        assert_eq!(StageInput::new("").check(), Err(InputError::EmptyUserInput));
        assert!(StageInput::new("  AI tutor ").check().is_ok());
    }

    #[test]
    fn test_stage_input_context_defaults_when_absent() {
        let input: StageInput = serde_json::from_value(json!({"user_input": "idea"})).unwrap();
        assert!(input.context.is_empty());
    }
}
