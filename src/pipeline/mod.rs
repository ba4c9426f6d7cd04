//! # Stage Pipeline
//!
//! Fixed linear pipeline over a per-run mutable state record:
//!
//! ```text
//! data_inspection -> augmentation_planning -> model_selection -> training -> done
//! ```
//!
//! Fail-fast: any unrecoverable stage error stops the run; no later stage
//! executes. Decision-service parse failures are recovered inside their
//! stage via documented fallbacks and never fail the run.

pub mod errors;
pub mod stages;
pub mod state;

pub use errors::{PipelineError, PipelineResult, StageFailure};
pub use stages::{run_pipeline, PipelineOutcome, StageContext};
pub use state::{
    AugPlan, ColorJitter, DatasetStats, ModelResults, ModelSelection, RunState, Stage,
};
