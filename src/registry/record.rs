use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::{RunState, Stage};

/// Lifecycle of a run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// One pipeline run as observed through the status endpoint.
///
/// `current_stage` stays at the first stage while the run executes and is
/// only moved during reconciliation, so readers never see a half-updated
/// record.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub current_stage: Stage,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub state: RunState,
}

impl RunRecord {
    pub fn new(run_id: Uuid, dataset_path: &str) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            current_stage: Stage::DataInspection,
            started_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
            failed_at: None,
            error: None,
            state: RunState::new(dataset_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_serializes_without_result_fields() {
        let record = RunRecord::new(Uuid::new_v4(), "/data/xray");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["status"], "running");
        assert_eq!(json["current_stage"], "data_inspection");
        assert_eq!(json["dataset_path"], "/data/xray");
        assert!(json.get("completed_at").is_none());
        assert!(json.get("failed_at").is_none());
        assert!(json.get("error").is_none());
    }
}
