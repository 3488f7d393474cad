//! Engineering stage: a website build brief plus a ready-to-use builder prompt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeringOutput {
    pub website_title: String,
    pub website_description: String,
    pub pages_required: Vec<String>,
    pub design_specifications: DesignSpecifications,
    pub functional_requirements: Vec<String>,
    pub content_strategy: ContentPlan,
    pub technical_specifications: TechnicalSpecifications,
    pub integration_requirements: Vec<String>,
    /// Prompt handed to a website builder tool.
    pub build_prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignSpecifications {
    pub color_scheme: String,
    pub typography: String,
    pub layout_style: String,
    pub responsive_design: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPlan {
    pub homepage_content: String,
    pub about_page: String,
    pub features_page: String,
    pub pricing_page: String,
    pub contact_page: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSpecifications {
    pub performance_requirements: String,
    pub seo_requirements: String,
    pub analytics_setup: String,
    pub security_requirements: String,
}

impl StageOutput for EngineeringOutput {
    const KIND: StageKind = StageKind::Engineering;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        let design = r.object("design_specifications");
        let content = r.object("content_strategy");
        let tech = r.object("technical_specifications");
        Ok(Self {
            website_title: r.required_text("website_title")?,
            website_description: r.text("website_description"),
            pages_required: r.text_list("pages_required"),
            design_specifications: DesignSpecifications {
                color_scheme: design.text("color_scheme"),
                typography: design.text("typography"),
                layout_style: design.text("layout_style"),
                responsive_design: design.text("responsive_design"),
            },
            functional_requirements: r.text_list("functional_requirements"),
            content_strategy: ContentPlan {
                homepage_content: content.text("homepage_content"),
                about_page: content.text("about_page"),
                features_page: content.text("features_page"),
                pricing_page: content.text("pricing_page"),
                contact_page: content.text("contact_page"),
            },
            technical_specifications: TechnicalSpecifications {
                performance_requirements: tech.text("performance_requirements"),
                seo_requirements: tech.text("seo_requirements"),
                analytics_setup: tech.text("analytics_setup"),
                security_requirements: tech.text("security_requirements"),
            },
            integration_requirements: r.text_list("integration_requirements"),
            build_prompt: r.required_text("build_prompt")?,
        })
    }

    fn fallback() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            website_title: "Product Landing Site".to_string(),
            website_description: "Marketing website introducing the product and converting \
                                  visitors into trial users."
                .to_string(),
            pages_required: strings(&["Home", "Features", "Pricing", "About", "Contact"]),
            design_specifications: DesignSpecifications {
                color_scheme: "Deep blue primary with neutral grays".to_string(),
                typography: "Modern sans-serif".to_string(),
                layout_style: "Clean, card-based sections".to_string(),
                responsive_design: "Mobile-first".to_string(),
            },
            functional_requirements: strings(&["Signup form", "Pricing table", "Contact form"]),
            content_strategy: ContentPlan {
                homepage_content: "Headline, value proposition and call to action".to_string(),
                about_page: "Mission and team".to_string(),
                features_page: "Feature highlights with screenshots".to_string(),
                pricing_page: "Plan comparison".to_string(),
                contact_page: "Contact form and support email".to_string(),
            },
            technical_specifications: TechnicalSpecifications {
                performance_requirements: "Largest contentful paint under 2.5s".to_string(),
                seo_requirements: "Semantic HTML, meta tags and sitemap".to_string(),
                analytics_setup: "Privacy-friendly page analytics".to_string(),
                security_requirements: "HTTPS only, validated form input".to_string(),
            },
            integration_requirements: strings(&["Email newsletter", "Payment checkout"]),
            build_prompt: "Build a responsive marketing website with Home, Features, Pricing, \
                           About and Contact pages. Use a clean card-based layout, a deep blue \
                           primary color and a modern sans-serif font. Include a signup form, a \
                           pricing comparison table and a contact form."
                .to_string(),
        }
    }
}
