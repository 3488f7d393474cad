//! Finance stage: revenue projection with risk and confidence.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceOutput {
    pub revenue_projection: RevenueProjection,
    pub timeline: String,
    pub revenue_sources: Vec<String>,
    pub risk_factors: Vec<String>,
    pub pricing_strategy: String,
    pub confidence_level: String,
}

/// Annual revenue range. `minimum <= most_likely <= maximum` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueProjection {
    pub minimum: f64,
    pub maximum: f64,
    pub most_likely: f64,
    pub currency: String,
}

impl StageOutput for FinanceOutput {
    const KIND: StageKind = StageKind::Finance;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        let projection = r.required_object("revenue_projection")?;
        let most_likely = projection
            .number("most_likely")
            .ok_or_else(|| {
                ValidationError::MissingField("$.revenue_projection.most_likely".to_string())
            })?;
        let minimum = projection.number_or("minimum", most_likely).min(most_likely);
        let maximum = projection.number_or("maximum", most_likely).max(most_likely);
        Ok(Self {
            revenue_projection: RevenueProjection {
                minimum,
                maximum,
                most_likely,
                currency: projection.text_or("currency", "USD"),
            },
            timeline: r.text("timeline"),
            revenue_sources: r.text_list("revenue_sources"),
            risk_factors: r.text_list("risk_factors"),
            pricing_strategy: r.text("pricing_strategy"),
            confidence_level: r.text_or("confidence_level", "medium"),
        })
    }

    fn fallback() -> Self {
        Self {
            revenue_projection: RevenueProjection {
                minimum: 10_000.0,
                maximum: 100_000.0,
                most_likely: 50_000.0,
                currency: "USD".to_string(),
            },
            timeline: "12 months".to_string(),
            revenue_sources: vec!["Subscriptions".to_string()],
            risk_factors: vec![
                "Market competition".to_string(),
                "Customer acquisition cost".to_string(),
            ],
            pricing_strategy: "Tiered subscription pricing".to_string(),
            confidence_level: "medium".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_bounds_are_ordered() {
        let output = FinanceOutput::from_value(&json!({
            "revenue_projection": {"minimum": 90000, "maximum": "20,000", "most_likely": 50000}
        }))
        .unwrap();
        let p = output.revenue_projection;
        assert_eq!((p.minimum, p.most_likely, p.maximum), (50_000.0, 50_000.0, 50_000.0));
        assert_eq!(p.currency, "USD");
        assert_eq!(output.confidence_level, "medium");
    }

    #[test]
    fn test_projection_requires_most_likely() {
        let err = FinanceOutput::from_value(&json!({
            "revenue_projection": {"minimum": 1000}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField("$.revenue_projection.most_likely".to_string())
        );
    }
}
