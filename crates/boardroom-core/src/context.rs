//! Per-run accumulated stage output.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("stage '{0}' already committed output for this run")]
    AlreadyCommitted(String),
}

/// Insertion-ordered, write-once map of stage name to committed output.
///
/// Owned by a single [`PipelineRun`](crate::run::PipelineRun); never shared
/// across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageContext {
    entries: Vec<(String, Value)>,
}

impl StageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a stage's output. A stage commits at most once per run.
    pub fn commit(&mut self, stage: impl Into<String>, output: Value) -> Result<(), ContextError> {
        let stage = stage.into();
        if self.contains(&stage) {
            return Err(ContextError::AlreadyCommitted(stage));
        }
        self.entries.push((stage, output));
        Ok(())
    }

    pub fn get(&self, stage: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.get(stage).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stage names in commit order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Copy of the named entries; `None` selects every committed entry.
    /// Names not yet committed are skipped.
    pub fn select(&self, stages: Option<&[String]>) -> Map<String, Value> {
        match stages {
            Some(names) => names
                .iter()
                .filter_map(|name| self.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
            None => self
                .entries
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

impl Serialize for StageContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
