//! Pipeline run state and per-stage results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::context::{ContextError, StageContext};

/// Outcome of one stage: genuine output, or its static fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub output: Value,
    /// False when `output` is the stage's static fallback.
    pub success: bool,
}

impl StageResult {
    pub fn produced(stage: impl Into<String>, output: Value) -> Self {
        Self {
            stage: stage.into(),
            output,
            success: true,
        }
    }

    pub fn fallback(stage: impl Into<String>, output: Value) -> Self {
        Self {
            stage: stage.into(),
            output,
            success: false,
        }
    }
}

/// Lifecycle of a run: `Pending -> Running(i) -> Completed | Failed(i)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running { stage: usize },
    Completed,
    Failed { stage: usize },
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed { .. })
    }
}

/// One pipeline execution, owned by the coordinator for its lifetime.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub id: Uuid,
    pub user_input: String,
    pub started_at: DateTime<Utc>,
    context: StageContext,
    results: Vec<StageResult>,
    status: RunStatus,
}

impl PipelineRun {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_input: user_input.into(),
            started_at: Utc::now(),
            context: StageContext::new(),
            results: Vec::new(),
            status: RunStatus::Pending,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn context(&self) -> &StageContext {
        &self.context
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// Index of the stage currently executing, if any.
    pub fn current_stage(&self) -> Option<usize> {
        match self.status {
            RunStatus::Running { stage } => Some(stage),
            _ => None,
        }
    }

    /// Enter stage `index`. Stages advance one at a time.
    pub fn begin_stage(&mut self, index: usize) {
        debug_assert!(!self.status.is_terminal());
        self.status = RunStatus::Running { stage: index };
    }

    /// Commit the current stage's result into the context.
    pub fn commit(&mut self, result: StageResult) -> Result<(), ContextError> {
        self.context.commit(result.stage.clone(), result.output.clone())?;
        self.results.push(result);
        Ok(())
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
    }

    pub fn fail(&mut self, stage: usize) {
        self.status = RunStatus::Failed { stage };
    }

    /// Names of stages whose committed output is a static fallback.
    pub fn fallback_stages(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.stage.clone())
            .collect()
    }

    pub fn into_results(self) -> Vec<StageResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_lifecycle() {
        let mut run = PipelineRun::new("AI tutor");
        assert_eq!(run.status(), RunStatus::Pending);
        assert_eq!(run.current_stage(), None);

        run.begin_stage(0);
        assert_eq!(run.current_stage(), Some(0));
        run.commit(StageResult::produced("concept", json!({"title": "T"})))
            .unwrap();

        run.begin_stage(1);
        run.commit(StageResult::fallback("research", json!({}))).unwrap();
        run.complete();

        assert!(run.status().is_terminal());
        assert_eq!(run.fallback_stages(), vec!["research"]);
        assert_eq!(run.context().len(), 2);
    }

    #[test]
    fn test_duplicate_commit_rejected() {
        let mut run = PipelineRun::new("idea");
        run.commit(StageResult::produced("concept", json!(1))).unwrap();
        assert!(run.commit(StageResult::produced("concept", json!(2))).is_err());
        assert_eq!(run.results().len(), 1);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(RunStatus::Failed { stage: 2 }).unwrap();
        assert_eq!(json, json!({"state": "failed", "stage": 2}));
    }

    #[test]
    fn test_runs_have_distinct_ids() {
        assert_ne!(PipelineRun::new("a").id, PipelineRun::new("a").id);
    }
}
