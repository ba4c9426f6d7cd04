//! # External Collaborators
//!
//! Narrow contracts for the three pieces the pipeline delegates to:
//! dataset analysis, planning/selection decisions, and model training.
//! The pipeline only sees these traits; the default implementations here
//! are deterministic stand-ins with the same observable contract.

pub mod advisor;
pub mod analyzer;
pub mod trainer;

pub use advisor::RuleBasedAdvisor;
pub use analyzer::FsAnalyzer;
pub use trainer::StubTrainer;

use std::path::Path;

use thiserror::Error;

use crate::pipeline::{AugPlan, DatasetStats, ModelResults, ModelSelection};

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Errors surfaced by a collaborator
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Filesystem problem while reading the dataset or writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The collaborator could not produce a result
    #[error("{0}")]
    Failed(String),
}

/// Dataset analyzer: path in, statistics record out. Pure, no state.
pub trait DatasetAnalyzer: Send + Sync {
    fn analyze(&self, root: &Path) -> CollaboratorResult<DatasetStats>;
}

/// Decision service consulted by stages 2 and 3.
///
/// Returns raw text that the calling stage parses; malformed output is the
/// stage's problem (it substitutes a fallback), not an error here.
pub trait DecisionService: Send + Sync {
    fn plan_augmentation(&self, stats: &DatasetStats) -> CollaboratorResult<String>;
    fn select_model(&self, stats: &DatasetStats) -> CollaboratorResult<String>;
}

/// Trainer: opaque long-running operation producing a persisted artifact
/// plus metrics.
pub trait ModelTrainer: Send + Sync {
    fn train(
        &self,
        dataset_path: &Path,
        plan: &AugPlan,
        selection: &ModelSelection,
        stats: &DatasetStats,
    ) -> CollaboratorResult<ModelResults>;
}
