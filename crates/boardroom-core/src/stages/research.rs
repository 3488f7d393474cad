//! Research stage: competitors, market analysis and historical precedent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub competitors: Vec<Competitor>,
    pub market_analysis: MarketAnalysis,
    pub recommendations: Recommendations,
    pub historical_context: String,
    pub similar_research: Vec<String>,
    pub market_patterns: Vec<String>,
    pub success_factors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    pub description: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub market_size: String,
    pub growth_potential: String,
    pub key_challenges: Vec<String>,
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub positioning: String,
    pub differentiation: String,
    pub target_audience: String,
}

impl StageOutput for ResearchOutput {
    const KIND: StageKind = StageKind::Research;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        let market = r.required_object("market_analysis")?;
        let recs = r.object("recommendations");
        Ok(Self {
            competitors: r
                .objects("competitors")
                .iter()
                .map(|c| Competitor {
                    name: c.text("name"),
                    description: c.text("description"),
                    strengths: c.text_list("strengths"),
                    weaknesses: c.text_list("weaknesses"),
                })
                .collect(),
            market_analysis: MarketAnalysis {
                market_size: market.required_text("market_size")?,
                growth_potential: market.text("growth_potential"),
                key_challenges: market.text_list("key_challenges"),
                opportunities: market.text_list("opportunities"),
            },
            recommendations: Recommendations {
                positioning: recs.text("positioning"),
                differentiation: recs.text("differentiation"),
                target_audience: recs.text("target_audience"),
            },
            historical_context: r.text("historical_context"),
            similar_research: r.text_list("similar_research"),
            market_patterns: r.text_list("market_patterns"),
            success_factors: r.text_list("success_factors"),
        })
    }

    fn fallback() -> Self {
        let competitor = |name: &str, description: &str| Competitor {
            name: name.to_string(),
            description: description.to_string(),
            strengths: vec!["Established customer base".to_string()],
            weaknesses: vec!["Slow to adopt new technology".to_string()],
        };
        Self {
            competitors: vec![
                competitor("Competitor 1", "Incumbent provider with a broad product suite"),
                competitor("Competitor 2", "Venture-backed startup targeting the same niche"),
            ],
            market_analysis: MarketAnalysis {
                market_size: "Market size estimate unavailable".to_string(),
                growth_potential: "Moderate".to_string(),
                key_challenges: vec![
                    "Customer acquisition cost".to_string(),
                    "Differentiation from incumbents".to_string(),
                ],
                opportunities: vec!["Underserved small-business segment".to_string()],
            },
            recommendations: Recommendations {
                positioning: "Focused specialist for an underserved segment".to_string(),
                differentiation: "Faster setup and better automation".to_string(),
                target_audience: "Small and medium businesses".to_string(),
            },
            historical_context: "No historical research available.".to_string(),
            similar_research: Vec::new(),
            market_patterns: Vec::new(),
            success_factors: vec!["Product-market fit".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_research_requires_market_size() {
        let err = ResearchOutput::from_value(&json!({
            "market_analysis": {"growth_potential": "High"}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField("$.market_analysis.market_size".to_string())
        );
    }

    #[test]
    fn test_research_numeric_market_size_is_text() {
        let output = ResearchOutput::from_value(&json!({
            "market_analysis": {"market_size": 50000000000u64},
            "competitors": [{"name": "Acme", "strengths": "Brand"}]
        }))
        .unwrap();
        assert_eq!(output.market_analysis.market_size, "50000000000");
        assert_eq!(output.competitors[0].strengths, vec!["Brand"]);
    }
}
