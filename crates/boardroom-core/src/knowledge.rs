//! Business knowledge consumed by the research stage's prompt.
//!
//! The store is a read-only key-value boundary: `lookup(category, key)`
//! returns a mapping of facts, empty when nothing is known. It never errors.
//!
//! ## Categories
//!
//! - `industry`: market size, growth rate, key players, trends
//! - `business_model`: revenue model, key metrics, success factors
//! - `market_segment`: audience, pain points, sales cycle
//! - `technology`: adoption rate, market impact, use cases
//! - `success_factor`: per company type (`AI_company`, `SaaS_company`, ...)
//! - `precedent`: historical research summary per industry

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Facts about one key within one category.
pub type Facts = BTreeMap<String, String>;

/// Query boundary for contextual business facts.
pub trait KnowledgeStore: Send + Sync {
    /// Facts for `key` in `category`, empty when unknown.
    fn lookup(&self, category: &str, key: &str) -> Facts;
}

type Table = &'static [(&'static str, &'static str, &'static [(&'static str, &'static str)])];

const SEED: Table = &[
    (
        "industry",
        "AI",
        &[
            ("market_size", "$50B"),
            ("growth_rate", "25%"),
            ("key_players", "OpenAI, Anthropic, Google, Microsoft"),
            ("trends", "LLMs, Agentic AI, Multimodal AI"),
        ],
    ),
    (
        "industry",
        "Fintech",
        &[
            ("market_size", "$310B"),
            ("growth_rate", "15%"),
            ("key_players", "Stripe, PayPal, Square, Coinbase"),
            ("trends", "Digital payments, DeFi, Embedded finance"),
        ],
    ),
    (
        "industry",
        "SaaS",
        &[
            ("market_size", "$720B"),
            ("growth_rate", "18%"),
            ("key_players", "Salesforce, Microsoft, Adobe, ServiceNow"),
            ("trends", "Vertical SaaS, AI integration, Low-code"),
        ],
    ),
    (
        "industry",
        "EdTech",
        &[
            ("market_size", "$340B"),
            ("growth_rate", "16%"),
            ("key_players", "Coursera, Khan Academy, Duolingo, Udemy"),
            ("trends", "Personalized learning, AI tutoring, VR education"),
        ],
    ),
    (
        "business_model",
        "SaaS",
        &[
            ("revenue_model", "Subscription"),
            ("key_metrics", "MRR, Churn, LTV, CAC"),
            ("success_factors", "Product-market fit, Customer success, Scalable infrastructure"),
        ],
    ),
    (
        "business_model",
        "Marketplace",
        &[
            ("revenue_model", "Commission"),
            ("key_metrics", "GMV, Take rate, Network effects"),
            ("success_factors", "Two-sided network, Trust, Liquidity"),
        ],
    ),
    (
        "business_model",
        "Freemium",
        &[
            ("revenue_model", "Freemium + Premium"),
            ("key_metrics", "Conversion rate, Free users, Premium features"),
            ("success_factors", "Value differentiation, User engagement, Viral growth"),
        ],
    ),
    (
        "market_segment",
        "B2B",
        &[
            ("target_audience", "Enterprises, SMBs"),
            ("pain_points", "Efficiency, Cost reduction, Scalability"),
            ("sales_cycle", "Long"),
        ],
    ),
    (
        "market_segment",
        "B2C",
        &[
            ("target_audience", "Individual consumers"),
            ("pain_points", "Convenience, Personalization, Value"),
            ("sales_cycle", "Short"),
        ],
    ),
    (
        "market_segment",
        "B2B2C",
        &[
            ("target_audience", "Businesses serving consumers"),
            ("pain_points", "Integration, White-label, Customer experience"),
            ("sales_cycle", "Medium"),
        ],
    ),
    (
        "technology",
        "LLMs",
        &[
            ("adoption_rate", "High"),
            ("market_impact", "Revolutionary"),
            ("use_cases", "Content generation, Customer service, Code assistance"),
        ],
    ),
    (
        "technology",
        "Blockchain",
        &[
            ("adoption_rate", "Medium"),
            ("market_impact", "Disruptive"),
            ("use_cases", "DeFi, NFTs, Supply chain, Identity"),
        ],
    ),
    (
        "technology",
        "Cloud",
        &[
            ("adoption_rate", "Very High"),
            ("market_impact", "Infrastructure"),
            ("use_cases", "Scalable computing, Storage, AI services"),
        ],
    ),
    (
        "success_factor",
        "AI_company",
        &[
            ("talent", "AI researchers, ML engineers"),
            ("data", "High-quality training data"),
            ("infrastructure", "GPU clusters, Cloud computing"),
            ("regulatory", "AI safety, Privacy compliance"),
        ],
    ),
    (
        "success_factor",
        "SaaS_company",
        &[
            ("product", "User experience, Feature completeness"),
            ("sales", "Inbound marketing, Customer success"),
            ("engineering", "Scalability, Reliability, Security"),
        ],
    ),
    (
        "success_factor",
        "Fintech_company",
        &[
            ("compliance", "Regulatory adherence, Security protocols"),
            ("trust", "User confidence, Transparency"),
            ("technology", "Secure infrastructure, API reliability"),
        ],
    ),
    (
        "success_factor",
        "EdTech_company",
        &[
            ("content", "Quality educational materials, Curriculum alignment"),
            ("engagement", "Student motivation, Interactive features"),
            ("accessibility", "User-friendly interface, Multi-device support"),
        ],
    ),
    (
        "precedent",
        "AI",
        &[
            ("studies", "3"),
            ("success_rate", "66.7%"),
            (
                "similar_research",
                "AI-Powered Customer Service Platform; AI Tutoring Platform for Students",
            ),
            ("common_competitors", "OpenAI, Anthropic, Google"),
            ("common_challenges", "Data privacy, AI accuracy, Integration complexity"),
            ("common_opportunities", "Automation demand, Cost reduction, Scalability"),
        ],
    ),
    (
        "precedent",
        "Fintech",
        &[
            ("studies", "2"),
            ("success_rate", "50.0%"),
            ("similar_research", "Blockchain Payment Solution for SMEs"),
            ("common_competitors", "Stripe, PayPal, Square"),
            ("common_challenges", "Regulatory compliance, Adoption barriers, Security concerns"),
            ("common_opportunities", "DeFi growth, SME digitization, Cross-border payments"),
        ],
    ),
    (
        "precedent",
        "SaaS",
        &[
            ("studies", "1"),
            ("success_rate", "100.0%"),
            ("common_competitors", "Salesforce, Microsoft, Adobe"),
            ("common_challenges", "Market competition, Feature differentiation"),
            ("common_opportunities", "AI integration, Vertical specialization"),
        ],
    ),
    (
        "precedent",
        "EdTech",
        &[
            ("studies", "1"),
            ("success_rate", "100.0%"),
            ("common_competitors", "Khan Academy, Duolingo, Coursera"),
            ("common_challenges", "Student engagement, Content quality, Personalization"),
            ("common_opportunities", "AI advancement, Remote learning, Personalized education"),
        ],
    ),
];

/// In-memory store seeded with built-in business facts.
#[derive(Debug, Clone)]
pub struct StaticKnowledgeStore {
    facts: BTreeMap<(String, String), Facts>,
}

impl StaticKnowledgeStore {
    /// Store with the built-in seed facts.
    pub fn seeded() -> Self {
        let mut store = Self::empty();
        for (category, key, facts) in SEED {
            for (name, value) in facts.iter() {
                store.insert(category, key, name, value);
            }
        }
        store
    }

    pub fn empty() -> Self {
        Self {
            facts: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, category: &str, key: &str, name: &str, value: &str) {
        self.facts
            .entry((category.to_string(), key.to_string()))
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    /// Number of `(category, key)` entries.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl Default for StaticKnowledgeStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl KnowledgeStore for StaticKnowledgeStore {
    fn lookup(&self, category: &str, key: &str) -> Facts {
        self.facts
            .get(&(category.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

lazy_static! {
    static ref INDUSTRY_RULES: Vec<(&'static str, Regex)> = vec![
        ("AI", keywords(&["ai", "artificial intelligence", "machine learning", "llm", "agent"])),
        ("Fintech", keywords(&["fintech", "finance", "payment", "blockchain", "crypto"])),
        ("SaaS", keywords(&["saas", "software", "platform", "api"])),
        ("EdTech", keywords(&["education", "learning", "tutoring", "course"])),
    ];
    static ref MODEL_RULES: Vec<(&'static str, Regex)> = vec![
        ("SaaS", keywords(&["subscription", "saas", "monthly", "annual"])),
        ("Marketplace", keywords(&["marketplace", "platform", "commission"])),
        ("Freemium", keywords(&["freemium", "free", "premium"])),
    ];
    static ref CONSUMER: Regex = keywords(&["consumer", "individual", "personal", "b2c"]);
}

/// Case-insensitive whole-word match for any of the keywords.
fn keywords(words: &[&str]) -> Regex {
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})s?\b", alternatives.join("|"))).unwrap()
}

/// Keyword classification of a business idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub industry: Option<String>,
    pub business_model: Option<String>,
    pub market_segment: String,
}

impl BusinessProfile {
    /// First matching industry and model rule wins; segment defaults to B2B.
    pub fn classify(title: &str, description: &str) -> Self {
        let text = format!("{title} {description}");
        let first_match = |rules: &[(&'static str, Regex)]| {
            rules
                .iter()
                .find(|(_, pattern)| pattern.is_match(&text))
                .map(|(label, _)| label.to_string())
        };
        let market_segment = if CONSUMER.is_match(&text) { "B2C" } else { "B2B" };
        Self {
            industry: first_match(&INDUSTRY_RULES),
            business_model: first_match(&MODEL_RULES),
            market_segment: market_segment.to_string(),
        }
    }

    /// Facts relevant to this profile, grouped by category.
    pub fn gather(&self, store: &dyn KnowledgeStore) -> BTreeMap<&'static str, Facts> {
        let mut gathered = BTreeMap::new();
        if let Some(industry) = &self.industry {
            gathered.insert("industry", store.lookup("industry", industry));
            gathered.insert("precedent", store.lookup("precedent", industry));
            gathered.insert(
                "success_factor",
                store.lookup("success_factor", &format!("{industry}_company")),
            );
        }
        if let Some(model) = &self.business_model {
            gathered.insert("business_model", store.lookup("business_model", model));
        }
        gathered.insert(
            "market_segment",
            store.lookup("market_segment", &self.market_segment),
        );
        gathered.retain(|_, facts| !facts.is_empty());
        gathered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        let store = StaticKnowledgeStore::seeded();
        let ai = store.lookup("industry", "AI");
        assert_eq!(ai.get("market_size").map(String::as_str), Some("$50B"));
        assert_eq!(ai.get("growth_rate").map(String::as_str), Some("25%"));

        assert!(store.lookup("industry", "Agritech").is_empty());
        assert!(store.lookup("weather", "AI").is_empty());
    }

    #[test]
    fn test_classify_industry_model_and_segment() {
        let profile = BusinessProfile::classify(
            "TutorBot",
            "Personal tutoring for students with a monthly subscription",
        );
        assert_eq!(profile.industry.as_deref(), Some("EdTech"));
        assert_eq!(profile.business_model.as_deref(), Some("SaaS"));
        assert_eq!(profile.market_segment, "B2C");
    }

    #[test]
    fn test_classify_matches_whole_words_only() {
        // "email" and "rapid" must not read as "ai" and "api".
        let profile = BusinessProfile::classify("Mailer", "Rapid email campaigns for companies");
        assert_eq!(profile.industry, None);
        assert_eq!(profile.market_segment, "B2B");
    }

    #[test]
    fn test_classify_first_rule_wins() {
        let profile = BusinessProfile::classify("AI payments agent", "");
        assert_eq!(profile.industry.as_deref(), Some("AI"));
    }

    #[test]
    fn test_gather_skips_empty_categories() {
        let store = StaticKnowledgeStore::seeded();
        let profile = BusinessProfile::classify("Freemium AI agents", "");
        let facts = profile.gather(&store);
        assert!(facts.contains_key("industry"));
        assert!(facts.contains_key("precedent"));
        assert!(facts.contains_key("success_factor"));
        assert!(facts.contains_key("business_model"));
        assert!(facts.contains_key("market_segment"));

        let unknown = BusinessProfile::classify("Bakery", "");
        let facts = unknown.gather(&StaticKnowledgeStore::empty());
        assert!(facts.is_empty());
    }
}
