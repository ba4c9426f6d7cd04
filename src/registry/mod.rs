//! # Run Registry & Async Bridge
//!
//! Owns the arena of run records, launches the blocking stage pipeline off
//! the request path, and reconciles its outcome back into the record in a
//! single atomic update.

pub mod artifacts;
pub mod errors;
pub mod record;

pub use artifacts::{list_artifacts, ArtifactEntry};
pub use errors::{RegistryError, RegistryResult};
pub use record::{RunRecord, RunStatus};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::collaborators::{DatasetAnalyzer, DecisionService, ModelTrainer};
use crate::feed::FeedSender;
use crate::observability::Logger;
use crate::pipeline::{run_pipeline, PipelineOutcome, Stage, StageContext};

/// The three collaborator contracts a run needs
pub struct Collaborators {
    pub analyzer: Box<dyn DatasetAnalyzer>,
    pub advisor: Box<dyn DecisionService>,
    pub trainer: Box<dyn ModelTrainer>,
}

/// Registry of pipeline runs, keyed by generated run id.
///
/// Writer discipline: a record is created once at submission and mutated
/// once more at completion, by the bridge task that owns that run. `status`
/// readers take the lock briefly and clone a snapshot.
pub struct RunRegistry {
    runs: RwLock<HashMap<Uuid, RunRecord>>,
    feed: FeedSender,
    collaborators: Arc<Collaborators>,
}

impl RunRegistry {
    /// Create a registry wired to the feed and collaborator set
    pub fn new(feed: FeedSender, collaborators: Collaborators) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            feed,
            collaborators: Arc::new(collaborators),
        }
    }

    /// Submit a new run. Returns the run id immediately; the pipeline
    /// executes on a blocking worker thread.
    pub fn submit(self: &Arc<Self>, dataset_path: &str) -> RegistryResult<Uuid> {
        if !Path::new(dataset_path).exists() {
            return Err(RegistryError::DatasetPathMissing(dataset_path.to_string()));
        }

        let run_id = Uuid::new_v4();
        let record = RunRecord::new(run_id, dataset_path);
        {
            let mut runs = self
                .runs
                .write()
                .map_err(|_| RegistryError::Internal("run map lock poisoned".to_string()))?;
            runs.insert(run_id, record);
        }

        Logger::info(
            "RUN_SUBMITTED",
            &[("run_id", &run_id.to_string()), ("dataset", dataset_path)],
        );
        self.feed.info(
            "orchestrator",
            format!("Pipeline started for dataset: {}", dataset_path),
        );

        let registry = Arc::clone(self);
        let collaborators = Arc::clone(&self.collaborators);
        let feed = self.feed.clone();
        let dataset = dataset_path.to_string();

        tokio::spawn(async move {
            let worker_feed = feed.clone();
            let joined = tokio::task::spawn_blocking(move || {
                let ctx = StageContext {
                    feed: &worker_feed,
                    analyzer: collaborators.analyzer.as_ref(),
                    advisor: collaborators.advisor.as_ref(),
                    trainer: collaborators.trainer.as_ref(),
                };
                run_pipeline(&ctx, &dataset)
            })
            .await;

            match joined {
                Ok(outcome) => registry.reconcile(run_id, outcome),
                // A panicking stage is still just a failed run.
                Err(join_error) => registry.reconcile_panic(run_id, join_error.to_string()),
            }
        });

        Ok(run_id)
    }

    /// Snapshot of a run record, or not-found.
    pub fn status(&self, run_id: Uuid) -> RegistryResult<RunRecord> {
        let runs = self
            .runs
            .read()
            .map_err(|_| RegistryError::Internal("run map lock poisoned".to_string()))?;
        runs.get(&run_id)
            .cloned()
            .ok_or(RegistryError::RunNotFound(run_id))
    }

    /// Number of records in the arena
    pub fn run_count(&self) -> usize {
        self.runs.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Fold a finished pipeline back into its record. One write-lock
    /// section covers the whole update, so a concurrent `status` sees
    /// either the running record or the fully finished one.
    fn reconcile(&self, run_id: Uuid, outcome: PipelineOutcome) {
        let now = Utc::now().to_rfc3339();

        if let Ok(mut runs) = self.runs.write() {
            if let Some(record) = runs.get_mut(&run_id) {
                record.state = outcome.state;
                match &outcome.failure {
                    None => {
                        record.status = RunStatus::Completed;
                        record.current_stage = Stage::Done;
                        record.completed_at = Some(now);
                    }
                    Some(failure) => {
                        record.status = RunStatus::Failed;
                        record.current_stage = Stage::Failed;
                        record.failed_at = Some(now);
                        record.error = Some(failure.error.to_string());
                    }
                }
            }
        }

        match outcome.failure {
            None => {
                Logger::info("RUN_COMPLETED", &[("run_id", &run_id.to_string())]);
                self.feed.info(
                    "orchestrator",
                    "Pipeline completed successfully! Model ready for testing.",
                );
            }
            Some(failure) => {
                Logger::error(
                    "RUN_FAILED",
                    &[
                        ("run_id", &run_id.to_string()),
                        ("stage", failure.stage.as_str()),
                        ("error", &failure.error.to_string()),
                    ],
                );
                self.feed
                    .error("orchestrator", format!("Pipeline failed: {}", failure.error));
            }
        }
    }

    /// A worker panic leaves no outcome; record the failure as-is.
    fn reconcile_panic(&self, run_id: Uuid, detail: String) {
        let now = Utc::now().to_rfc3339();
        if let Ok(mut runs) = self.runs.write() {
            if let Some(record) = runs.get_mut(&run_id) {
                record.status = RunStatus::Failed;
                record.current_stage = Stage::Failed;
                record.failed_at = Some(now);
                record.error = Some(detail.clone());
            }
        }
        Logger::error(
            "RUN_PANICKED",
            &[("run_id", &run_id.to_string()), ("error", &detail)],
        );
        self.feed
            .error("orchestrator", format!("Pipeline failed: {}", detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FsAnalyzer, RuleBasedAdvisor, StubTrainer};
    use crate::feed;

    fn test_registry(models_dir: &Path) -> Arc<RunRegistry> {
        let (sender, _rx) = feed::channel();
        Arc::new(RunRegistry::new(
            sender,
            Collaborators {
                analyzer: Box::new(FsAnalyzer::new()),
                advisor: Box::new(RuleBasedAdvisor::new()),
                trainer: Box::new(StubTrainer::new(models_dir)),
            },
        ))
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path());

        let err = registry.submit("/no/such/dataset").unwrap_err();
        assert!(matches!(err, RegistryError::DatasetPathMissing(_)));
        // Input errors mutate nothing.
        assert_eq!(registry.run_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_run_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path());

        let err = registry.status(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RegistryError::RunNotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_returns_running_record_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path());

        let run_id = registry.submit(dataset.path().to_str().unwrap()).unwrap();
        let record = registry.status(run_id).unwrap();
        assert_eq!(record.run_id, run_id);
        // Immediately after submit the record exists and is not reused.
        assert!(record.started_at.len() > 0);
    }
}
