//! Run state and the structured records each stage produces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::explain::ModelFamily;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DataInspection,
    AugmentationPlanning,
    ModelSelection,
    Training,
    Done,
    Failed,
}

impl Stage {
    /// Wire name, also used as the feed `agent` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DataInspection => "data_inspection",
            Stage::AugmentationPlanning => "augmentation_planning",
            Stage::ModelSelection => "model_selection",
            Stage::Training => "training",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dataset statistics record produced by the analyzer collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Total number of images across all splits
    pub size: usize,
    /// Class label -> image count (summed over splits)
    pub class_dist: BTreeMap<String, usize>,
    /// Max class count / min class count; 1.0 when fewer than two classes
    pub imbalance_ratio: f64,
    /// Mean Laplacian variance (higher = sharper)
    pub avg_blur: f64,
    /// Mean per-image pixel standard deviation
    pub avg_noise: f64,
    /// Number of distinct class labels
    pub num_classes: usize,
}

/// Color jitter intensity in the augmentation plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorJitter {
    None,
    Low,
    Medium,
}

/// Augmentation decision record. All three fields are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugPlan {
    /// Rotation range in degrees
    pub rotation: i32,
    /// Whether to apply random horizontal flips
    pub flip: bool,
    /// Color jitter intensity
    pub color_jitter: ColorJitter,
}

impl AugPlan {
    /// Fallback plan substituted when the decision service output
    /// cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            rotation: 10,
            flip: true,
            color_jitter: ColorJitter::Low,
        }
    }
}

/// Model selection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    /// Chosen architecture family
    pub selected_model: ModelFamily,
    /// One-sentence rationale from the decision service
    pub reason: String,
}

impl ModelSelection {
    /// Fallback selection. Always the resnet family, as a literal
    /// constant, regardless of which rule path failed.
    pub fn fallback() -> Self {
        Self {
            selected_model: ModelFamily::Resnet,
            reason: "Fallback selection".to_string(),
        }
    }
}

/// Training output record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResults {
    pub accuracy: f64,
    pub f1: f64,
    pub family: ModelFamily,
    pub artifact_path: String,
}

/// Mutable record threaded through the pipeline stages.
///
/// Each optional field is written exactly once, by its owning stage;
/// presence of a field signals that its stage has completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Input dataset root, immutable after creation
    pub dataset_path: String,
    /// Written by stage 1 (data inspection)
    pub dataset_stats: Option<DatasetStats>,
    /// Written by stage 2 (augmentation planning)
    pub aug_plan: Option<AugPlan>,
    /// Written by stage 3 (model selection)
    pub selected_model: Option<ModelSelection>,
    /// Written by stage 4 (training)
    pub model_results: Option<ModelResults>,
}

impl RunState {
    /// Fresh state for a new run
    pub fn new(dataset_path: impl Into<String>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            dataset_stats: None,
            aug_plan: None,
            selected_model: None,
            model_results: None,
        }
    }
}
