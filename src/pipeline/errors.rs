//! Pipeline error types.

use thiserror::Error;

use super::state::Stage;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Unrecoverable errors raised inside a stage
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Dataset analysis failed
    #[error("Dataset analysis failed: {0}")]
    Analysis(String),

    /// Decision service was unreachable (parse failures are recovered
    /// in-stage and never surface here)
    #[error("Decision service error: {0}")]
    DecisionService(String),

    /// Trainer collaborator failed
    #[error("Training failed: {0}")]
    Training(String),
}

/// A stage failure: which stage stopped the run, and why
#[derive(Debug, Clone)]
pub struct StageFailure {
    /// Stage that raised the error
    pub stage: Stage,
    /// Captured error text, recorded on the run
    pub error: PipelineError,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}
