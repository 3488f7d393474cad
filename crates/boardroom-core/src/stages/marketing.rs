//! Marketing stage: positioning, channels, campaign and budget.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingOutput {
    pub brand_positioning: String,
    pub key_messages: Vec<String>,
    pub target_segments: Vec<TargetSegment>,
    pub marketing_channels: Vec<MarketingChannel>,
    pub content_strategy: ContentStrategy,
    pub social_media: SocialMedia,
    pub launch_campaign: LaunchCampaign,
    pub budget_recommendations: BudgetRecommendations,
    pub success_metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSegment {
    pub segment: String,
    pub characteristics: Vec<String>,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingChannel {
    pub channel: String,
    pub strategy: String,
    pub budget_allocation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentStrategy {
    pub content_types: Vec<String>,
    pub content_themes: Vec<String>,
    pub publishing_schedule: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialMedia {
    pub platforms: Vec<String>,
    pub strategy: String,
    pub engagement_tactics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchCampaign {
    pub pre_launch: Vec<String>,
    pub launch_day: Vec<String>,
    pub post_launch: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecommendations {
    pub total_budget: String,
    pub allocation: BTreeMap<String, String>,
}

impl StageOutput for MarketingOutput {
    const KIND: StageKind = StageKind::Marketing;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        let content = r.object("content_strategy");
        let social = r.object("social_media");
        let launch = r.object("launch_campaign");
        let budget = r.object("budget_recommendations");
        Ok(Self {
            brand_positioning: r.required_text("brand_positioning")?,
            key_messages: r.text_list("key_messages"),
            target_segments: r
                .objects("target_segments")
                .iter()
                .map(|s| TargetSegment {
                    segment: s.text("segment"),
                    characteristics: s.text_list("characteristics"),
                    channels: s.text_list("channels"),
                })
                .collect(),
            marketing_channels: r
                .objects("marketing_channels")
                .iter()
                .map(|c| MarketingChannel {
                    channel: c.text("channel"),
                    strategy: c.text("strategy"),
                    budget_allocation: c.text("budget_allocation"),
                })
                .collect(),
            content_strategy: ContentStrategy {
                content_types: content.text_list("content_types"),
                content_themes: content.text_list("content_themes"),
                publishing_schedule: content.text("publishing_schedule"),
            },
            social_media: SocialMedia {
                platforms: social.text_list("platforms"),
                strategy: social.text("strategy"),
                engagement_tactics: social.text_list("engagement_tactics"),
            },
            launch_campaign: LaunchCampaign {
                pre_launch: launch.text_list("pre_launch"),
                launch_day: launch.text_list("launch_day"),
                post_launch: launch.text_list("post_launch"),
            },
            budget_recommendations: BudgetRecommendations {
                total_budget: budget.text("total_budget"),
                allocation: budget.text_map("allocation"),
            },
            success_metrics: r.text_list("success_metrics"),
        })
    }

    fn fallback() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            brand_positioning: "The practical AI assistant for teams that want results without \
                                complexity."
                .to_string(),
            key_messages: strings(&["Save hours every week", "Set up in minutes"]),
            target_segments: vec![TargetSegment {
                segment: "Small business owners".to_string(),
                characteristics: strings(&["Time-constrained", "Cost-conscious"]),
                channels: strings(&["LinkedIn", "Email"]),
            }],
            marketing_channels: vec![
                MarketingChannel {
                    channel: "Content marketing".to_string(),
                    strategy: "Educational articles and case studies".to_string(),
                    budget_allocation: "40%".to_string(),
                },
                MarketingChannel {
                    channel: "Paid social".to_string(),
                    strategy: "Targeted campaigns for decision makers".to_string(),
                    budget_allocation: "30%".to_string(),
                },
            ],
            content_strategy: ContentStrategy {
                content_types: strings(&["Blog posts", "Webinars"]),
                content_themes: strings(&["Productivity", "Automation"]),
                publishing_schedule: "Weekly".to_string(),
            },
            social_media: SocialMedia {
                platforms: strings(&["LinkedIn", "X"]),
                strategy: "Thought leadership and product updates".to_string(),
                engagement_tactics: strings(&["Customer spotlights", "Live Q&A"]),
            },
            launch_campaign: LaunchCampaign {
                pre_launch: strings(&["Build waitlist"]),
                launch_day: strings(&["Announcement across channels"]),
                post_launch: strings(&["Collect testimonials"]),
            },
            budget_recommendations: BudgetRecommendations {
                total_budget: "$50,000".to_string(),
                allocation: [
                    ("content".to_string(), "40%".to_string()),
                    ("events".to_string(), "30%".to_string()),
                    ("paid_social".to_string(), "30%".to_string()),
                ]
                .into_iter()
                .collect(),
            },
            success_metrics: strings(&["Customer acquisition cost", "Website conversion rate"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marketing_allocation_values_coerced() {
        let output = MarketingOutput::from_value(&json!({
            "brand_positioning": "Simple",
            "budget_recommendations": {"total_budget": 25000, "allocation": {"ads": 60, "seo": "40%"}}
        }))
        .unwrap();
        assert_eq!(output.budget_recommendations.total_budget, "25000");
        assert_eq!(output.budget_recommendations.allocation["ads"], "60");
        assert_eq!(output.budget_recommendations.allocation["seo"], "40%");
    }
}
