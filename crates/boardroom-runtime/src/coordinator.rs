//! Pipeline coordinator.
//!
//! Runs every stage in configured order for one user input, feeding each
//! stage the committed outputs it reads. Stages never overlap within a run.
//!
//! ## Failure policy
//!
//! - A stage that answers with its static fallback is absorbed and the run
//!   continues, unless the stage is marked `strict`.
//! - A stage that cannot be reached, times out, or answers with something
//!   other than a stage result fails the run. Later stages are not called.
//!
//! The coordinator never retries a stage call: the stage has already been
//! through its own provider fallback by the time it answers.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use boardroom_core::{ContextError, PipelineRun, RunStatus, StageContext, StageInput, StageResult};

use crate::config::ConfigError;
use crate::observe::{Absorption, AbsorptionObserver, TracingObserver};
use crate::transport::SUCCESS_HEADER;

/// Where and how to call one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEndpoint {
    pub name: String,
    pub url: String,
    pub timeout: Duration,
    pub strict: bool,
    /// Upstream stages forwarded to this stage; all when `None`
    pub inputs: Option<Vec<String>>,
}

impl StageEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout,
            strict: false,
            inputs: None,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn reading<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = Some(stages.into_iter().map(Into::into).collect());
        self
    }
}

/// Calling a stage agent failed at the transport level.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("could not reach stage: {0}")]
    Connect(String),

    #[error("stage did not answer within {0:?}")]
    Timeout(Duration),

    #[error("stage answered with status {0}")]
    Status(u16),

    #[error("stage answer is not a valid result: {0}")]
    Decode(String),
}

/// Why the run as a whole failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowCause {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("strict stage returned fallback data")]
    StrictFallback,

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// A run failed. `stage_index` is the 1-based position of the failing stage.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("pipeline failed at stage {stage_index} ({stage}): {cause}")]
pub struct WorkflowError {
    pub run_id: Uuid,
    pub stage_index: usize,
    pub stage: String,
    pub cause: WorkflowCause,
}

/// How the coordinator reaches a stage agent.
#[async_trait]
pub trait StageTransport: Send + Sync {
    /// Call `endpoint` once. Must be bounded by `endpoint.timeout`.
    async fn call(
        &self,
        endpoint: &StageEndpoint,
        input: &StageInput,
    ) -> Result<StageResult, TransportError>;
}

/// Calls stage agents over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStageTransport {
    client: reqwest::Client,
}

impl HttpStageTransport {
    pub fn new() -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    async fn call_inner(
        &self,
        endpoint: &StageEndpoint,
        input: &StageInput,
    ) -> Result<StageResult, TransportError> {
        let response = self
            .client
            .post(&endpoint.url)
            .json(input)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        // A missing flag means the stage does not report fallbacks.
        let success = response
            .headers()
            .get(SUCCESS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |v| !v.trim().eq_ignore_ascii_case("false"));

        let output: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        if !output.is_object() {
            return Err(TransportError::Decode("expected a JSON object".to_string()));
        }

        Ok(StageResult {
            stage: endpoint.name.clone(),
            output,
            success,
        })
    }
}

#[async_trait]
impl StageTransport for HttpStageTransport {
    async fn call(
        &self,
        endpoint: &StageEndpoint,
        input: &StageInput,
    ) -> Result<StageResult, TransportError> {
        match tokio::time::timeout(endpoint.timeout, self.call_inner(endpoint, input)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(endpoint.timeout)),
        }
    }
}

/// Metadata of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub user_input: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    /// Echoed from the request; never limits the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_count_hint: Option<u32>,
    /// Stages whose output is static fallback data
    pub fallback_stages: Vec<String>,
}

/// Success flag of one stage in the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFlag {
    pub stage: String,
    pub success: bool,
}

/// Aggregate of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub metadata: RunMetadata,
    /// Stage name to output, in execution order
    pub outputs: StageContext,
    pub stages: Vec<StageFlag>,
}

impl PipelineReport {
    fn from_run(run: PipelineRun, stage_count_hint: Option<u32>) -> Self {
        let metadata = RunMetadata {
            run_id: run.id,
            user_input: run.user_input.clone(),
            status: run.status(),
            started_at: run.started_at,
            timestamp: Utc::now(),
            stage_count_hint,
            fallback_stages: run.fallback_stages(),
        };
        let outputs = run.context().clone();
        let stages = run
            .into_results()
            .into_iter()
            .map(|r| StageFlag {
                stage: r.stage,
                success: r.success,
            })
            .collect();
        Self {
            metadata,
            outputs,
            stages,
        }
    }
}

/// Runs the pipeline. Holds no per-run state, so one coordinator serves
/// any number of concurrent runs.
pub struct Coordinator {
    stages: Vec<StageEndpoint>,
    transport: Arc<dyn StageTransport>,
    observer: Arc<dyn AbsorptionObserver>,
}

impl Coordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    pub fn stages(&self) -> &[StageEndpoint] {
        &self.stages
    }

    /// Execute one run end to end.
    pub async fn run(
        &self,
        user_input: &str,
        stage_count_hint: Option<u32>,
    ) -> Result<PipelineReport, WorkflowError> {
        let mut run = PipelineRun::new(user_input.trim());
        tracing::info!(run_id = %run.id, stages = self.stages.len(), "Pipeline run started");

        for (i, endpoint) in self.stages.iter().enumerate() {
            let position = i + 1;
            run.begin_stage(position);

            let input = StageInput {
                user_input: run.user_input.clone(),
                context: run.context().select(endpoint.inputs.as_deref()),
            };
            tracing::debug!(run_id = %run.id, stage = %endpoint.name, position, "Calling stage");

            let result = match self.transport.call(endpoint, &input).await {
                Ok(result) => result,
                Err(e) => return Err(self.abort(&mut run, position, endpoint, e.into())),
            };

            if !result.success {
                if endpoint.strict {
                    return Err(self.abort(&mut run, position, endpoint, WorkflowCause::StrictFallback));
                }
                self.observer.absorbed(Absorption::fallback_accepted(&endpoint.name));
            }

            if let Err(e) = run.commit(result) {
                return Err(self.abort(&mut run, position, endpoint, e.into()));
            }
        }

        run.complete();
        let report = PipelineReport::from_run(run, stage_count_hint);
        tracing::info!(
            run_id = %report.metadata.run_id,
            fallbacks = report.metadata.fallback_stages.len(),
            "Pipeline run completed"
        );
        Ok(report)
    }

    fn abort(
        &self,
        run: &mut PipelineRun,
        position: usize,
        endpoint: &StageEndpoint,
        cause: WorkflowCause,
    ) -> WorkflowError {
        run.fail(position);
        tracing::error!(run_id = %run.id, stage = %endpoint.name, position, error = %cause, "Pipeline run failed");
        WorkflowError {
            run_id: run.id,
            stage_index: position,
            stage: endpoint.name.clone(),
            cause,
        }
    }
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    stages: Vec<StageEndpoint>,
    transport: Option<Arc<dyn StageTransport>>,
    observer: Arc<dyn AbsorptionObserver>,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            transport: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Append a stage; stages run in the order added.
    pub fn stage(mut self, endpoint: StageEndpoint) -> Self {
        self.stages.push(endpoint);
        self
    }

    pub fn stages(mut self, endpoints: impl IntoIterator<Item = StageEndpoint>) -> Self {
        self.stages.extend(endpoints);
        self
    }

    /// Defaults to [`HttpStageTransport`].
    pub fn transport(mut self, transport: Arc<dyn StageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn AbsorptionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<Coordinator, ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpStageTransport::new()?),
        };
        Ok(Coordinator {
            stages: self.stages,
            transport,
            observer: self.observer,
        })
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of `POST /process-business-idea`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub user_input: String,
    #[serde(default)]
    pub stage_count_hint: Option<u32>,
}

/// Answer of `POST /process-business-idea`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Router exposing the coordinator.
pub fn coordinator_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/process-business-idea", post(process_business_idea))
        .with_state(coordinator)
        .layer(TraceLayer::new_for_http())
}

async fn process_business_idea(
    State(coordinator): State<Arc<Coordinator>>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, (StatusCode, String)> {
    if req.user_input.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "user_input must not be empty".to_string()));
    }

    match coordinator.run(&req.user_input, req.stage_count_hint).await {
        Ok(report) => {
            let message = if report.metadata.fallback_stages.is_empty() {
                "Business idea processed by all stages".to_string()
            } else {
                format!(
                    "Business idea processed; fallback data used for: {}",
                    report.metadata.fallback_stages.join(", ")
                )
            };
            let data = serde_json::to_value(&report)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            Ok(Json(ProcessResponse {
                success: true,
                message,
                data: Some(data),
                error: None,
            }))
        }
        Err(e) => Ok(Json(ProcessResponse {
            success: false,
            message: format!("Pipeline failed at stage {} ({})", e.stage_index, e.stage),
            data: None,
            error: Some(e.to_string()),
        })),
    }
}
