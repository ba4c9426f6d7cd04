//! The four pipeline stages and the fail-fast executor.

use std::path::Path;

use crate::collaborators::{DatasetAnalyzer, DecisionService, ModelTrainer};
use crate::feed::FeedSender;

use super::errors::{PipelineError, StageFailure};
use super::state::{AugPlan, ModelSelection, RunState, Stage};

/// Everything a stage needs: the feed producer and the collaborators.
pub struct StageContext<'a> {
    pub feed: &'a FeedSender,
    pub analyzer: &'a dyn DatasetAnalyzer,
    pub advisor: &'a dyn DecisionService,
    pub trainer: &'a dyn ModelTrainer,
}

/// Final state of a run after the executor returns
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Run state with every field its reached stages produced
    pub state: RunState,
    /// Present when a stage raised an unrecoverable error
    pub failure: Option<StageFailure>,
}

impl PipelineOutcome {
    /// Stage the run ended on: `done`, or the failing stage.
    pub fn final_stage(&self) -> Stage {
        match &self.failure {
            Some(failure) => failure.stage,
            None => Stage::Done,
        }
    }
}

/// Run the four stages strictly in order on a fresh state.
///
/// Blocking; callers move this onto a worker thread. A stage error stops
/// the run immediately and no later stage executes.
pub fn run_pipeline(ctx: &StageContext<'_>, dataset_path: &str) -> PipelineOutcome {
    let mut state = RunState::new(dataset_path);

    let stages: [(Stage, StageFn); 4] = [
        (Stage::DataInspection, inspect_data),
        (Stage::AugmentationPlanning, plan_augmentation),
        (Stage::ModelSelection, select_model),
        (Stage::Training, train_model),
    ];

    for (stage, run_stage) in stages {
        if let Err(error) = run_stage(ctx, &mut state) {
            ctx.feed
                .error(stage.as_str(), format!("Stage failed: {}", error));
            return PipelineOutcome {
                state,
                failure: Some(StageFailure { stage, error }),
            };
        }
    }

    PipelineOutcome {
        state,
        failure: None,
    }
}

type StageFn = fn(&StageContext<'_>, &mut RunState) -> Result<(), PipelineError>;

/// Stage 1: dataset statistics from the analyzer collaborator.
fn inspect_data(ctx: &StageContext<'_>, state: &mut RunState) -> Result<(), PipelineError> {
    let agent = Stage::DataInspection.as_str();
    ctx.feed.info(agent, "Data Inspector Running...");
    ctx.feed
        .info(agent, format!("Scanning dataset at: {}", state.dataset_path));

    let stats = ctx
        .analyzer
        .analyze(Path::new(&state.dataset_path))
        .map_err(|e| PipelineError::Analysis(e.to_string()))?;

    ctx.feed.info(
        agent,
        format!(
            "Dataset Stats: {} images, {} classes, imbalance ratio {:.2}",
            stats.size, stats.num_classes, stats.imbalance_ratio
        ),
    );
    state.dataset_stats = Some(stats);
    ctx.feed.info(agent, "Finished.");
    Ok(())
}

/// Stage 2: augmentation plan from the decision service, with a fixed
/// fallback when its output does not parse.
fn plan_augmentation(ctx: &StageContext<'_>, state: &mut RunState) -> Result<(), PipelineError> {
    let agent = Stage::AugmentationPlanning.as_str();
    ctx.feed.info(agent, "Augmentation Planner Running...");

    // Stage order guarantees stats are present; treat absence as a bug
    // in the executor, surfaced as a stage failure rather than a panic.
    let stats = state
        .dataset_stats
        .as_ref()
        .ok_or_else(|| PipelineError::Analysis("dataset stats missing".to_string()))?;

    let raw = ctx
        .advisor
        .plan_augmentation(stats)
        .map_err(|e| PipelineError::DecisionService(e.to_string()))?;
    ctx.feed.info(agent, format!("Raw service output: {}", raw));

    let plan = match serde_json::from_str::<AugPlan>(raw.trim()) {
        Ok(plan) => plan,
        Err(_) => {
            ctx.feed
                .warning(agent, "Decision parse failed. Using fallback defaults.");
            AugPlan::fallback()
        }
    };

    ctx.feed.info(
        agent,
        format!(
            "Final Augmentation Plan: rotation={}, flip={}, color_jitter={:?}",
            plan.rotation, plan.flip, plan.color_jitter
        ),
    );
    state.aug_plan = Some(plan);
    ctx.feed.info(agent, "Finished.");
    Ok(())
}

/// Stage 3: architecture choice from the decision service, falling back
/// to the resnet family on any parse failure.
fn select_model(ctx: &StageContext<'_>, state: &mut RunState) -> Result<(), PipelineError> {
    let agent = Stage::ModelSelection.as_str();
    ctx.feed.info(agent, "Model Selection Agent Running...");

    let stats = state
        .dataset_stats
        .as_ref()
        .ok_or_else(|| PipelineError::Analysis("dataset stats missing".to_string()))?;

    let raw = ctx
        .advisor
        .select_model(stats)
        .map_err(|e| PipelineError::DecisionService(e.to_string()))?;
    ctx.feed.info(agent, format!("Raw service output: {}", raw));

    let selection = match serde_json::from_str::<ModelSelection>(raw.trim()) {
        Ok(selection) => selection,
        Err(_) => {
            ctx.feed
                .warning(agent, "Decision parse failed. Falling back to resnet.");
            ModelSelection::fallback()
        }
    };

    ctx.feed.info(
        agent,
        format!("Selected Model: {}", selection.selected_model),
    );
    state.selected_model = Some(selection);
    ctx.feed.info(agent, "Finished.");
    Ok(())
}

/// Stage 4: hand off to the trainer collaborator.
fn train_model(ctx: &StageContext<'_>, state: &mut RunState) -> Result<(), PipelineError> {
    let agent = Stage::Training.as_str();
    ctx.feed.info(agent, "Model Trainer Running...");

    let stats = state
        .dataset_stats
        .as_ref()
        .ok_or_else(|| PipelineError::Analysis("dataset stats missing".to_string()))?;
    let plan = state
        .aug_plan
        .as_ref()
        .ok_or_else(|| PipelineError::Training("augmentation plan missing".to_string()))?;
    let selection = state
        .selected_model
        .as_ref()
        .ok_or_else(|| PipelineError::Training("model selection missing".to_string()))?;

    ctx.feed
        .info(agent, format!("Selected Model: {}", selection.selected_model));
    ctx.feed
        .info(agent, format!("Number of Classes: {}", stats.num_classes));

    let results = ctx
        .trainer
        .train(Path::new(&state.dataset_path), plan, selection, stats)
        .map_err(|e| PipelineError::Training(e.to_string()))?;

    ctx.feed.info(
        agent,
        format!(
            "Training Complete. accuracy={:.3}, f1={:.3}, artifact={}",
            results.accuracy, results.f1, results.artifact_path
        ),
    );
    state.model_results = Some(results);
    ctx.feed.info(agent, "Finished.");
    Ok(())
}
