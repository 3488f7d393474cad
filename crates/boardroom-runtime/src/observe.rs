//! Observability hook for absorbed failures.
//!
//! Every point that swallows a failure and keeps going reports it here:
//! the fallback chain when a provider fails, the stage agent when it
//! substitutes its static fallback, and the coordinator when it accepts
//! fallback data from a non-strict stage. Control flow never depends on
//! the observer.

use parking_lot::Mutex;
use serde::Serialize;

/// Which absorption point reported the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsorptionKind {
    /// One provider failed; the chain moves to the next.
    ProviderFailed,
    /// A stage agent substituted its static fallback.
    StageFallback,
    /// The coordinator continued past a stage's fallback data.
    FallbackAccepted,
}

/// One absorbed failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Absorption {
    pub kind: AbsorptionKind,
    pub stage: Option<String>,
    pub provider: Option<String>,
    pub cause: String,
}

impl Absorption {
    pub fn provider_failed(stage: Option<&str>, provider: &str, cause: impl ToString) -> Self {
        Self {
            kind: AbsorptionKind::ProviderFailed,
            stage: stage.map(str::to_string),
            provider: Some(provider.to_string()),
            cause: cause.to_string(),
        }
    }

    pub fn stage_fallback(stage: &str, cause: impl ToString) -> Self {
        Self {
            kind: AbsorptionKind::StageFallback,
            stage: Some(stage.to_string()),
            provider: None,
            cause: cause.to_string(),
        }
    }

    pub fn fallback_accepted(stage: &str) -> Self {
        Self {
            kind: AbsorptionKind::FallbackAccepted,
            stage: Some(stage.to_string()),
            provider: None,
            cause: "stage returned fallback data".to_string(),
        }
    }
}

/// Receives every absorbed failure.
pub trait AbsorptionObserver: Send + Sync {
    fn absorbed(&self, event: Absorption);
}

/// Emits each absorption as a `warn` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AbsorptionObserver for TracingObserver {
    fn absorbed(&self, event: Absorption) {
        tracing::warn!(
            kind = ?event.kind,
            stage = event.stage.as_deref().unwrap_or("-"),
            provider = event.provider.as_deref().unwrap_or("-"),
            cause = %event.cause,
            "Absorbed failure"
        );
    }
}

/// Keeps every event in memory. Also forwards to tracing.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Absorption>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Absorption> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: AbsorptionKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

impl AbsorptionObserver for RecordingObserver {
    fn absorbed(&self, event: Absorption) {
        TracingObserver.absorbed(event.clone());
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_counts_by_kind() {
        let observer = RecordingObserver::new();
        observer.absorbed(Absorption::provider_failed(Some("concept"), "cerebras", "HTTP 500"));
        observer.absorbed(Absorption::provider_failed(None, "asi-one", "timeout"));
        observer.absorbed(Absorption::stage_fallback("concept", "all providers failed"));

        assert_eq!(observer.count(AbsorptionKind::ProviderFailed), 2);
        assert_eq!(observer.count(AbsorptionKind::StageFallback), 1);
        assert_eq!(observer.count(AbsorptionKind::FallbackAccepted), 0);

        let events = observer.events();
        assert_eq!(events[0].stage.as_deref(), Some("concept"));
        assert_eq!(events[1].provider.as_deref(), Some("asi-one"));
    }
}
