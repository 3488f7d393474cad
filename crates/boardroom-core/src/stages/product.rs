//! Product stage: product definition and go-to-market outline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOutput {
    pub product_name: String,
    pub product_description: String,
    pub core_features: Vec<String>,
    pub target_market: TargetMarket,
    pub value_proposition: String,
    pub go_to_market: GoToMarket,
    pub revenue_model: String,
    pub success_metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMarket {
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoToMarket {
    pub channels: Vec<String>,
    pub pricing_strategy: String,
    pub launch_plan: String,
}

impl StageOutput for ProductOutput {
    const KIND: StageKind = StageKind::Product;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        let market = r.object("target_market");
        let gtm = r.object("go_to_market");
        Ok(Self {
            product_name: r.required_text("product_name")?,
            product_description: r.required_text("product_description")?,
            core_features: r.text_list("core_features"),
            target_market: TargetMarket {
                primary: market.text("primary"),
                secondary: market.text("secondary"),
            },
            value_proposition: r.required_text("value_proposition")?,
            go_to_market: GoToMarket {
                channels: gtm.text_list("channels"),
                pricing_strategy: gtm.text("pricing_strategy"),
                launch_plan: gtm.text("launch_plan"),
            },
            revenue_model: r.text("revenue_model"),
            success_metrics: r.text_list("success_metrics"),
        })
    }

    fn fallback() -> Self {
        Self {
            product_name: "AI Product Concept".to_string(),
            product_description: "An AI-assisted product that streamlines the core workflow \
                                  of its target users."
                .to_string(),
            core_features: vec![
                "Guided onboarding".to_string(),
                "Automated recommendations".to_string(),
                "Usage analytics dashboard".to_string(),
            ],
            target_market: TargetMarket {
                primary: "Small and medium businesses".to_string(),
                secondary: "Independent professionals".to_string(),
            },
            value_proposition: "Saves time on repetitive work while improving decision quality."
                .to_string(),
            go_to_market: GoToMarket {
                channels: vec!["Content marketing".to_string(), "Direct sales".to_string()],
                pricing_strategy: "Tiered monthly subscription".to_string(),
                launch_plan: "Private beta followed by a public launch".to_string(),
            },
            revenue_model: "Subscription".to_string(),
            success_metrics: vec![
                "Monthly active users".to_string(),
                "Trial-to-paid conversion".to_string(),
            ],
        }
    }
}
