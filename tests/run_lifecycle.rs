//! Run Lifecycle Tests
//!
//! End-to-end behavior of the run registry against real collaborators:
//!
//! 1. Submission returns immediately and the run completes in background
//! 2. Stage outputs appear exactly once, in stage order
//! 3. Collaborator failures mark the run failed without losing earlier output
//! 4. Decision-service garbage is absorbed by fallbacks, never failing a run

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use autovision::collaborators::{
    CollaboratorError, CollaboratorResult, DatasetAnalyzer, DecisionService, FsAnalyzer,
    ModelTrainer, RuleBasedAdvisor, StubTrainer,
};
use autovision::feed;
use autovision::pipeline::{AugPlan, DatasetStats, ModelSelection, Stage};
use autovision::registry::{Collaborators, RegistryError, RunRecord, RunRegistry, RunStatus};

// =============================================================================
// Helpers
// =============================================================================

/// Build an ImageFolder-layout dataset with placeholder files
fn make_dataset(root: &Path) {
    for (split, class, n) in [("train", "cat", 4), ("train", "dog", 4), ("test", "cat", 2)] {
        let dir = root.join(split).join(class);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..n {
            std::fs::write(dir.join(format!("img{i}.jpg")), b"placeholder").unwrap();
        }
    }
}

fn default_registry(models_dir: &Path) -> Arc<RunRegistry> {
    registry_with(
        models_dir,
        Box::new(FsAnalyzer::new()),
        Box::new(RuleBasedAdvisor::new()),
    )
}

fn registry_with(
    models_dir: &Path,
    analyzer: Box<dyn DatasetAnalyzer>,
    advisor: Box<dyn DecisionService>,
) -> Arc<RunRegistry> {
    let (sender, _rx) = feed::channel();
    Arc::new(RunRegistry::new(
        sender,
        Collaborators {
            analyzer,
            advisor,
            trainer: Box::new(StubTrainer::new(models_dir)),
        },
    ))
}

/// Poll the registry until the run leaves the running state
async fn await_terminal(registry: &RunRegistry, run_id: uuid::Uuid) -> RunRecord {
    for _ in 0..200 {
        let record = registry.status(run_id).unwrap();
        if record.status != RunStatus::Running {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("run {run_id} did not reach a terminal state");
}

struct FailingAnalyzer;

impl DatasetAnalyzer for FailingAnalyzer {
    fn analyze(&self, _root: &Path) -> CollaboratorResult<DatasetStats> {
        Err(CollaboratorError::Failed("corrupt index file".to_string()))
    }
}

/// Advisor that answers with text no stage can parse
struct GarbageAdvisor;

impl DecisionService for GarbageAdvisor {
    fn plan_augmentation(&self, _stats: &DatasetStats) -> CollaboratorResult<String> {
        Ok("sorry, I can only answer in prose".to_string())
    }

    fn select_model(&self, _stats: &DatasetStats) -> CollaboratorResult<String> {
        Ok("try a neural network maybe?".to_string())
    }
}

struct FailingTrainer;

impl ModelTrainer for FailingTrainer {
    fn train(
        &self,
        _dataset_path: &Path,
        _plan: &AugPlan,
        _selection: &ModelSelection,
        _stats: &DatasetStats,
    ) -> CollaboratorResult<autovision::pipeline::ModelResults> {
        Err(CollaboratorError::Failed("out of GPU memory".to_string()))
    }
}

// =============================================================================
// Submission
// =============================================================================

/// Submission returns a fresh id while the pipeline is still executing.
#[tokio::test]
async fn test_submit_returns_before_completion() {
    let dataset = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    make_dataset(dataset.path());
    let registry = default_registry(models.path());

    let run_id = registry.submit(dataset.path().to_str().unwrap()).unwrap();

    // The record is queryable immediately, whatever state it is in.
    let record = registry.status(run_id).unwrap();
    assert_eq!(record.run_id, run_id);
    assert_eq!(record.state.dataset_path, dataset.path().to_str().unwrap());
}

/// A dataset path that does not exist is rejected synchronously and no
/// record is created.
#[tokio::test]
async fn test_missing_dataset_path_is_rejected() {
    let models = tempfile::tempdir().unwrap();
    let registry = default_registry(models.path());

    let err = registry.submit("/nonexistent/dataset").unwrap_err();
    assert!(matches!(err, RegistryError::DatasetPathMissing(_)));
    assert_eq!(registry.run_count(), 0);
}

/// Unknown run ids are a lookup error, not a panic or empty record.
#[tokio::test]
async fn test_unknown_run_id() {
    let models = tempfile::tempdir().unwrap();
    let registry = default_registry(models.path());

    let err = registry.status(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, RegistryError::RunNotFound(_)));
}

// =============================================================================
// Completion
// =============================================================================

/// A healthy run reaches `completed` with every stage output present and
/// a loadable artifact on disk.
#[tokio::test]
async fn test_run_completes_with_all_stage_outputs() {
    let dataset = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    make_dataset(dataset.path());
    let registry = default_registry(models.path());

    let run_id = registry.submit(dataset.path().to_str().unwrap()).unwrap();
    let record = await_terminal(&registry, run_id).await;

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.current_stage, Stage::Done);
    assert!(record.completed_at.is_some());
    assert!(record.failed_at.is_none());
    assert!(record.error.is_none());

    let stats = record.state.dataset_stats.expect("stage 1 output");
    assert_eq!(stats.size, 10);
    assert_eq!(stats.num_classes, 2);
    assert!(record.state.aug_plan.is_some());
    let selection = record.state.selected_model.expect("stage 3 output");
    let results = record.state.model_results.expect("stage 4 output");
    assert_eq!(results.family, selection.selected_model);
    assert!(Path::new(&results.artifact_path).exists());
    assert!((0.0..=1.0).contains(&results.accuracy));
}

// =============================================================================
// Failure
// =============================================================================

/// A failing analyzer fails the run at stage 1: no later stage output
/// exists and the error text is preserved on the record.
#[tokio::test]
async fn test_analysis_failure_fails_the_run_early() {
    let dataset = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    let registry = registry_with(
        models.path(),
        Box::new(FailingAnalyzer),
        Box::new(RuleBasedAdvisor::new()),
    );

    let run_id = registry.submit(dataset.path().to_str().unwrap()).unwrap();
    let record = await_terminal(&registry, run_id).await;

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.current_stage, Stage::Failed);
    assert!(record.failed_at.is_some());
    assert!(record.error.unwrap().contains("corrupt index file"));
    assert!(record.state.dataset_stats.is_none());
    assert!(record.state.aug_plan.is_none());
    assert!(record.state.selected_model.is_none());
    assert!(record.state.model_results.is_none());
}

/// A failing trainer fails the run but keeps every earlier stage output.
#[tokio::test]
async fn test_training_failure_preserves_earlier_outputs() {
    let dataset = tempfile::tempdir().unwrap();
    make_dataset(dataset.path());
    let (sender, _rx) = feed::channel();
    let registry = Arc::new(RunRegistry::new(
        sender,
        Collaborators {
            analyzer: Box::new(FsAnalyzer::new()),
            advisor: Box::new(RuleBasedAdvisor::new()),
            trainer: Box::new(FailingTrainer),
        },
    ));

    let run_id = registry.submit(dataset.path().to_str().unwrap()).unwrap();
    let record = await_terminal(&registry, run_id).await;

    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("out of GPU memory"));
    assert!(record.state.dataset_stats.is_some());
    assert!(record.state.aug_plan.is_some());
    assert!(record.state.selected_model.is_some());
    assert!(record.state.model_results.is_none());
}

// =============================================================================
// Fallbacks
// =============================================================================

/// Unparseable decision-service output never fails a run: the documented
/// fallback plan and selection are substituted and training proceeds.
#[tokio::test]
async fn test_garbage_decisions_fall_back_and_complete() {
    let dataset = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    make_dataset(dataset.path());
    let registry = registry_with(
        models.path(),
        Box::new(FsAnalyzer::new()),
        Box::new(GarbageAdvisor),
    );

    let run_id = registry.submit(dataset.path().to_str().unwrap()).unwrap();
    let record = await_terminal(&registry, run_id).await;

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.state.aug_plan.unwrap(), AugPlan::fallback());
    assert_eq!(
        record.state.selected_model.unwrap(),
        ModelSelection::fallback()
    );
    // The fallback family actually trained.
    let results = record.state.model_results.unwrap();
    assert_eq!(results.family, ModelSelection::fallback().selected_model);
}
