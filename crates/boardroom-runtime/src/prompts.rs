//! Prompt templates for the seven pipeline stages.
//!
//! Every prompt is a pure function of the stage input: the same user input
//! and upstream outputs always render the same text. Each ends with the JSON
//! shape the stage validates, so the answer can be extracted directly.

use std::collections::BTreeMap;

use boardroom_core::{BusinessProfile, Facts, StageInput, StageKind};

/// Shared instruction appended to every prompt.
const JSON_ONLY: &str = "Respond with the JSON object only, without commentary or markdown.";

/// Render a stage prompt without knowledge-store facts.
///
/// The research agent adds facts through [`research`].
pub fn render(kind: StageKind, input: &StageInput) -> String {
    match kind {
        StageKind::Concept => concept(input),
        StageKind::Research => research(input, &profile_of(input), &BTreeMap::new()),
        StageKind::Product => product(input),
        StageKind::Marketing => marketing(input),
        StageKind::Technical => technical(input),
        StageKind::Engineering => engineering(input),
        StageKind::Finance => finance(input),
    }
}

/// Classify the idea from the concept stage's title and description.
pub fn profile_of(input: &StageInput) -> BusinessProfile {
    BusinessProfile::classify(
        &input.upstream_text(StageKind::Concept, "title"),
        &input.upstream_text(StageKind::Concept, "description"),
    )
}

fn concept(input: &StageInput) -> String {
    format!(
        r#"You are the visionary CEO of an AI company. A founder brings you this business idea:

{idea}

Shape it into a business concept that could realistically reach $1 million in revenue.

Provide:
1. A catchy title
2. A brief description (2-3 sentences)
3. The revenue model
4. Why it could succeed

Format your response as JSON with this structure:
{{
  "title": "Concept title",
  "description": "Brief description",
  "revenue_model": "How it makes money",
  "success_factors": ["Why it could work", "Another reason"]
}}

{JSON_ONLY}"#,
        idea = input.user_input.trim(),
    )
}

/// Research prompt enriched with knowledge-store facts.
pub fn research(
    input: &StageInput,
    profile: &BusinessProfile,
    facts: &BTreeMap<&'static str, Facts>,
) -> String {
    let mut knowledge = String::new();
    for (category, entries) in facts {
        knowledge.push_str(&format!("{category}:\n"));
        for (name, value) in entries {
            knowledge.push_str(&format!("- {name}: {value}\n"));
        }
    }
    if knowledge.is_empty() {
        knowledge.push_str("No structured knowledge matched this idea.\n");
    }

    format!(
        r#"As an expert market research specialist with access to structured business knowledge, analyze this business idea:

BUSINESS IDEA:
Title: {title}
Description: {description}
Revenue Model: {revenue_model}
Original request: {user_input}

CLASSIFICATION:
Industry: {industry}
Business Model: {business_model}
Market Segment: {segment}

KNOWLEDGE CONTEXT:
{knowledge}
Provide:
1. Competitive landscape: existing competitors and their positioning
2. Market opportunity: size, growth potential and barriers
3. Success patterns from comparable businesses
4. Key challenges and how to mitigate them
5. Positioning and differentiation recommendations

Format your response as JSON with this structure:
{{
  "competitors": [
    {{
      "name": "Competitor name",
      "description": "What they do",
      "strengths": ["Their advantages"],
      "weaknesses": ["Their limitations"]
    }}
  ],
  "market_analysis": {{
    "market_size": "Estimated market size with context",
    "growth_potential": "High/Medium/Low with reasoning",
    "key_challenges": ["Challenge 1", "Challenge 2"],
    "opportunities": ["Opportunity 1", "Opportunity 2"]
  }},
  "recommendations": {{
    "positioning": "How to position the business",
    "differentiation": "How to stand out",
    "target_audience": "Primary target market with reasoning"
  }},
  "historical_context": "What comparable businesses teach us",
  "market_patterns": ["Pattern 1"],
  "success_factors": ["Factor 1"]
}}

{JSON_ONLY}"#,
        title = input.upstream_text(StageKind::Concept, "title"),
        description = input.upstream_text(StageKind::Concept, "description"),
        revenue_model = input.upstream_text(StageKind::Concept, "revenue_model"),
        user_input = input.user_input.trim(),
        industry = profile.industry.as_deref().unwrap_or("Unclassified"),
        business_model = profile.business_model.as_deref().unwrap_or("Unclassified"),
        segment = profile.market_segment,
    )
}

fn product(input: &StageInput) -> String {
    format!(
        r#"As a product strategist, develop a detailed product concept based on this business idea and research:

BUSINESS CONCEPT:
{concept}

MARKET RESEARCH:
{research}

Format your response as JSON with this structure:
{{
  "product_name": "Product name",
  "product_description": "What the product does",
  "core_features": ["Feature 1", "Feature 2", "Feature 3"],
  "target_market": {{
    "primary": "Primary audience",
    "secondary": "Secondary audience"
  }},
  "value_proposition": "Why customers choose it",
  "go_to_market": {{
    "channels": ["Channel 1", "Channel 2"],
    "pricing_strategy": "How it is priced",
    "launch_plan": "How it launches"
  }},
  "revenue_model": "How it makes money",
  "success_metrics": ["Metric 1", "Metric 2"]
}}

{JSON_ONLY}"#,
        concept = input.upstream_json(StageKind::Concept),
        research = input.upstream_json(StageKind::Research),
    )
}

fn marketing(input: &StageInput) -> String {
    format!(
        r#"As a Chief Marketing Officer, develop a comprehensive marketing strategy for this product:

PRODUCT:
{product}

BUSINESS CONCEPT:
{concept}

MARKET RESEARCH:
{research}

Format your response as JSON with this structure:
{{
  "brand_positioning": "How the brand is positioned",
  "key_messages": ["Message 1", "Message 2"],
  "target_segments": [
    {{
      "segment": "Segment name",
      "characteristics": ["Trait 1"],
      "channels": ["Channel 1"]
    }}
  ],
  "marketing_channels": [
    {{
      "channel": "Channel name",
      "strategy": "How it is used",
      "budget_allocation": "Share of budget"
    }}
  ],
  "content_strategy": {{
    "content_types": ["Type 1"],
    "content_themes": ["Theme 1"],
    "publishing_schedule": "Cadence"
  }},
  "social_media": {{
    "platforms": ["Platform 1"],
    "strategy": "Approach",
    "engagement_tactics": ["Tactic 1"]
  }},
  "launch_campaign": {{
    "pre_launch": ["Activity 1"],
    "launch_day": ["Activity 1"],
    "post_launch": ["Activity 1"]
  }},
  "budget_recommendations": {{
    "total_budget": "Total marketing budget",
    "allocation": {{"digital": "40%", "content": "30%", "events": "30%"}}
  }},
  "success_metrics": ["Metric 1", "Metric 2"]
}}

{JSON_ONLY}"#,
        product = input.upstream_json(StageKind::Product),
        concept = input.upstream_json(StageKind::Concept),
        research = input.upstream_json(StageKind::Research),
    )
}

fn technical(input: &StageInput) -> String {
    format!(
        r#"As a Chief Technology Officer, develop a comprehensive technical strategy for this product:

PRODUCT:
{product}

BUSINESS CONCEPT:
{concept}

MARKET RESEARCH:
{research}

Format your response as JSON with this structure:
{{
  "technology_stack": {{
    "frontend": ["Technology 1"],
    "backend": ["Technology 1"],
    "database": "Primary database",
    "cloud_platform": "Hosting platform",
    "ai_ml": ["Model or service"]
  }},
  "architecture": {{
    "overview": "System architecture summary",
    "components": ["Component 1"],
    "data_flow": "How data moves",
    "api_design": "API style"
  }},
  "development_methodology": "How the team works",
  "security_compliance": ["Requirement 1"],
  "scalability": "How it scales",
  "integrations": ["Integration 1"],
  "timeline": {{
    "phases": [
      {{"phase": "Phase name", "duration": "Length", "deliverables": ["Deliverable 1"]}}
    ],
    "total_duration": "Overall timeline",
    "milestones": ["Milestone 1"]
  }},
  "team_structure": ["Role 1"],
  "infrastructure": "Infrastructure plan",
  "quality_assurance": "Testing approach"
}}

{JSON_ONLY}"#,
        product = input.upstream_json(StageKind::Product),
        concept = input.upstream_json(StageKind::Concept),
        research = input.upstream_json(StageKind::Research),
    )
}

fn engineering(input: &StageInput) -> String {
    format!(
        r#"As a Head of Engineering, write a complete website brief, including a build prompt for an AI website builder, for this project:

BUSINESS CONCEPT:
{concept}

PRODUCT:
{product}

MARKET RESEARCH:
{research}

MARKETING STRATEGY:
{marketing}

TECHNICAL STRATEGY:
{technical}

The build prompt must be self-contained: pages, sections, copy direction, visual style and functionality.

Format your response as JSON with this structure:
{{
  "website_title": "Site title",
  "website_description": "What the site is for",
  "pages_required": ["Home", "About"],
  "design_specifications": {{
    "color_scheme": "Colors",
    "typography": "Fonts",
    "layout_style": "Layout",
    "responsive_design": "Responsive approach"
  }},
  "functional_requirements": ["Requirement 1"],
  "content_strategy": {{
    "homepage_content": "Homepage copy direction",
    "about_page": "About page direction",
    "features_page": "Features page direction",
    "pricing_page": "Pricing page direction",
    "contact_page": "Contact page direction"
  }},
  "technical_specifications": {{
    "performance_requirements": "Performance targets",
    "seo_requirements": "SEO needs",
    "analytics_setup": "Analytics",
    "security_requirements": "Security needs"
  }},
  "integration_requirements": ["Integration 1"],
  "build_prompt": "Complete prompt for the website builder"
}}

{JSON_ONLY}"#,
        concept = input.upstream_json(StageKind::Concept),
        product = input.upstream_json(StageKind::Product),
        research = input.upstream_json(StageKind::Research),
        marketing = input.upstream_json(StageKind::Marketing),
        technical = input.upstream_json(StageKind::Technical),
    )
}

fn finance(input: &StageInput) -> String {
    format!(
        r#"As the Finance Agent for an AI company, analyze the revenue potential for this project:

Project: {title}
Description: {description}
Product: {product_name}
Revenue Model: {revenue_model}

Estimate first-year revenue in USD.

Format your response as JSON with this structure:
{{
  "revenue_projection": {{
    "minimum": 10000,
    "maximum": 100000,
    "most_likely": 50000,
    "currency": "USD"
  }},
  "timeline": "Time to reach the projection",
  "revenue_sources": ["Source 1"],
  "risk_factors": ["Risk 1"],
  "pricing_strategy": "Pricing approach",
  "confidence_level": "low/medium/high"
}}

{JSON_ONLY}"#,
        title = input.upstream_text(StageKind::Concept, "title"),
        description = input.upstream_text(StageKind::Concept, "description"),
        product_name = input.upstream_text(StageKind::Product, "product_name"),
        revenue_model = input.upstream_text(StageKind::Product, "revenue_model"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_core::{KnowledgeStore, StaticKnowledgeStore};
    use proptest::prelude::*;
    use serde_json::json;

    fn input() -> StageInput {
        StageInput::new("An AI tutor for high school students")
            .with_upstream(
                "concept",
                json!({"title": "TutorBot", "description": "AI tutoring", "revenue_model": "Subscription"}),
            )
            .with_upstream("product", json!({"product_name": "TutorBot Pro", "revenue_model": "Monthly plan"}))
    }

    #[test]
    fn test_prompts_are_deterministic() {
        for kind in StageKind::ALL {
            assert_eq!(render(kind, &input()), render(kind, &input()), "{kind}");
        }
    }

    #[test]
    fn test_prompts_embed_inputs() {
        assert!(render(StageKind::Concept, &input()).contains("An AI tutor for high school students"));
        assert!(render(StageKind::Product, &input()).contains("\"title\": \"TutorBot\""));

        let finance = render(StageKind::Finance, &input());
        assert!(finance.contains("Project: TutorBot"));
        assert!(finance.contains("Product: TutorBot Pro"));
        assert!(finance.contains("Revenue Model: Monthly plan"));
    }

    #[test]
    fn test_missing_upstream_renders_empty_object() {
        let prompt = render(StageKind::Marketing, &StageInput::new("idea"));
        assert!(prompt.contains("PRODUCT:\n{}"));
    }

    #[test]
    fn test_research_prompt_lists_knowledge() {
        let store = StaticKnowledgeStore::seeded();
        let profile = BusinessProfile::classify("TutorBot", "AI tutoring with a monthly subscription");
        let facts = profile.gather(&store as &dyn KnowledgeStore);
        let prompt = research(&input(), &profile, &facts);

        assert!(prompt.contains("Title: TutorBot"));
        assert!(prompt.contains("KNOWLEDGE CONTEXT:"));
        assert!(!prompt.contains("No structured knowledge matched"));
    }

    #[test]
    fn test_every_prompt_names_the_json_shape() {
        for kind in StageKind::ALL {
            assert!(render(kind, &input()).ends_with(JSON_ONLY), "{kind}");
        }
    }

    proptest! {
        #[test]
        fn prop_any_idea_renders_a_complete_prompt(idea in "[a-zA-Z0-9 .,'!?-]{1,120}") {
            let input = StageInput::new(idea.clone());
            for kind in StageKind::ALL {
                let prompt = render(kind, &input);
                prop_assert_eq!(&prompt, &render(kind, &input));
                prop_assert!(prompt.ends_with(JSON_ONLY));
            }
            prop_assert!(render(StageKind::Concept, &input).contains(idea.trim()));
        }
    }
}
