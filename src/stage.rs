// src/stage.rs
//
// Outcome of a stage that may degrade without failing the request.

use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage ran and produced a new value.
    Applied(T),
    /// The stage could not run; `value` is the untouched input.
    Fallback { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        StageOutcome::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, StageOutcome::Applied(_))
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Applied(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            StageOutcome::Applied(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    /// Unwrap the value, logging a fallback under `stage`.
    pub fn log_fallback(self, stage: &str) -> T {
        if let StageOutcome::Fallback { reason, .. } = &self {
            warn!("{} skipped: {}", stage, reason);
        }
        self.into_inner()
    }
}
