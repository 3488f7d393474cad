//! Concept stage: turns the raw idea into a named business concept.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptOutput {
    pub title: String,
    pub description: String,
    pub revenue_model: String,
    pub success_factors: Vec<String>,
}

impl StageOutput for ConceptOutput {
    const KIND: StageKind = StageKind::Concept;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        Ok(Self {
            title: r.required_text("title")?,
            description: r.required_text("description")?,
            revenue_model: r.text("revenue_model"),
            success_factors: r.text_list("success_factors"),
        })
    }

    fn fallback() -> Self {
        Self {
            title: "AI-Powered Business Concept".to_string(),
            description: "A software product that applies AI to automate a costly manual \
                          workflow for a clearly defined customer group."
                .to_string(),
            revenue_model: "Subscription".to_string(),
            success_factors: vec![
                "Clear problem-solution fit".to_string(),
                "Fast time to first value".to_string(),
                "Scalable acquisition channel".to_string(),
            ],
        }
    }
}
