//! Technical stage: stack, architecture and delivery timeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StageKind, StageOutput};
use crate::coerce::{FieldReader, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalOutput {
    pub technology_stack: TechnologyStack,
    pub architecture: Architecture,
    pub development_methodology: String,
    pub security_compliance: Vec<String>,
    pub scalability: String,
    pub integrations: Vec<String>,
    pub timeline: Timeline,
    pub team_structure: Vec<String>,
    pub infrastructure: String,
    pub quality_assurance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyStack {
    pub frontend: Vec<String>,
    pub backend: Vec<String>,
    /// Always text; providers often answer with an object here.
    pub database: String,
    pub cloud_platform: String,
    pub ai_ml: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub overview: String,
    pub components: Vec<String>,
    pub data_flow: String,
    pub api_design: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub phases: Vec<Phase>,
    pub total_duration: String,
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub phase: String,
    pub duration: String,
    pub deliverables: Vec<String>,
}

impl StageOutput for TechnicalOutput {
    const KIND: StageKind = StageKind::Technical;

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let r = FieldReader::new(value)?;
        let stack = r.required_object("technology_stack")?;
        let arch = r.object("architecture");
        let timeline = r.object("timeline");
        Ok(Self {
            technology_stack: TechnologyStack {
                frontend: stack.text_list("frontend"),
                backend: stack.text_list("backend"),
                database: stack.required_text("database")?,
                cloud_platform: stack.text("cloud_platform"),
                ai_ml: stack.text_list("ai_ml"),
            },
            architecture: Architecture {
                overview: arch.required_text("overview")?,
                components: arch.text_list("components"),
                data_flow: arch.text("data_flow"),
                api_design: arch.text("api_design"),
            },
            development_methodology: r.text("development_methodology"),
            security_compliance: r.text_list("security_compliance"),
            scalability: r.text("scalability"),
            integrations: r.text_list("integrations"),
            timeline: Timeline {
                phases: timeline
                    .objects("phases")
                    .iter()
                    .map(|p| Phase {
                        phase: p.text("phase"),
                        duration: p.text("duration"),
                        deliverables: p.text_list("deliverables"),
                    })
                    .collect(),
                total_duration: timeline.text("total_duration"),
                milestones: timeline.text_list("milestones"),
            },
            team_structure: r.text_list("team_structure"),
            infrastructure: r.text("infrastructure"),
            quality_assurance: r.text("quality_assurance"),
        })
    }

    fn fallback() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            technology_stack: TechnologyStack {
                frontend: strings(&["React", "TypeScript"]),
                backend: strings(&["Node.js", "REST API"]),
                database: "PostgreSQL".to_string(),
                cloud_platform: "AWS".to_string(),
                ai_ml: strings(&["Hosted LLM API"]),
            },
            architecture: Architecture {
                overview: "Web client backed by a stateless API service and a managed \
                           relational database."
                    .to_string(),
                components: strings(&["Web app", "API service", "Database", "Job queue"]),
                data_flow: "Client requests flow through the API to the database; long \
                            tasks run on the job queue."
                    .to_string(),
                api_design: "Versioned JSON REST endpoints".to_string(),
            },
            development_methodology: "Agile with two-week sprints".to_string(),
            security_compliance: strings(&["Encryption at rest and in transit", "GDPR"]),
            scalability: "Horizontal scaling of stateless services".to_string(),
            integrations: strings(&["Payment processor", "Email delivery"]),
            timeline: Timeline {
                phases: vec![
                    Phase {
                        phase: "MVP".to_string(),
                        duration: "3 months".to_string(),
                        deliverables: strings(&["Core workflow", "Billing"]),
                    },
                    Phase {
                        phase: "Scale".to_string(),
                        duration: "3 months".to_string(),
                        deliverables: strings(&["Integrations", "Analytics"]),
                    },
                ],
                total_duration: "6 months".to_string(),
                milestones: strings(&["Beta launch", "General availability"]),
            },
            team_structure: strings(&["2 full-stack engineers", "1 designer", "1 product lead"]),
            infrastructure: "Managed containers with CI/CD".to_string(),
            quality_assurance: "Automated tests on every change plus staged rollouts".to_string(),
        }
    }
}
