//! Stand-in trainer collaborator.
//!
//! Real training is an opaque external operation; this implementation
//! keeps the contract honest end to end: it persists a family-shaped
//! learned-parameter artifact plus the class-name list under the models
//! directory, so the explainability engine can load and explain what
//! "training" produced.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::explain::{Artifact, ModelFamily, TensorData};
use crate::pipeline::{AugPlan, DatasetStats, ModelResults, ModelSelection};

use super::{CollaboratorError, CollaboratorResult, ModelTrainer};

/// Width of the stem convolution output
const STEM_CHANNELS: usize = 8;

/// Trainer that materializes artifacts without a training loop
#[derive(Debug)]
pub struct StubTrainer {
    models_dir: PathBuf,
}

impl StubTrainer {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    fn class_names(stats: &DatasetStats) -> Vec<String> {
        if stats.class_dist.len() >= 2 {
            stats.class_dist.keys().cloned().collect()
        } else {
            vec!["class_0".to_string(), "class_1".to_string()]
        }
    }
}

impl ModelTrainer for StubTrainer {
    fn train(
        &self,
        _dataset_path: &Path,
        _plan: &AugPlan,
        selection: &ModelSelection,
        stats: &DatasetStats,
    ) -> CollaboratorResult<ModelResults> {
        let family = selection.selected_model;
        let class_names = Self::class_names(stats);
        let num_classes = class_names.len();

        std::fs::create_dir_all(&self.models_dir)?;

        let artifact = build_artifact(family, num_classes);
        let artifact_path = self.models_dir.join(family.artifact_file_name());
        artifact.save(&artifact_path)?;

        let classes_path = self.models_dir.join(family.classes_file_name());
        let classes_json = serde_json::to_vec(&class_names)
            .map_err(|e| CollaboratorError::Failed(e.to_string()))?;
        std::fs::write(&classes_path, classes_json)?;

        // Placeholder metrics in lieu of a real training loop.
        let accuracy = (0.97 - 0.015 * num_classes as f64).clamp(0.6, 0.97);
        Ok(ModelResults {
            accuracy,
            f1: accuracy - 0.02,
            family,
            artifact_path: artifact_path.display().to_string(),
        })
    }
}

/// Family-shaped parameter set with small random weights
fn build_artifact(family: ModelFamily, num_classes: usize) -> Artifact {
    let mut rng = StdRng::seed_from_u64(42 + family as u64);
    let mut artifact = Artifact::new(family);

    let mut tensor = |shape: Vec<usize>| -> TensorData {
        let len = shape.iter().product();
        let data = (0..len).map(|_| rng.gen_range(-0.1..0.1)).collect();
        TensorData::new(shape, data)
    };

    artifact.insert("stem.weight", tensor(vec![STEM_CHANNELS, 3, 3, 3]));

    let feature_channels = match family {
        ModelFamily::Resnet => {
            for i in 0..2 {
                artifact.insert(
                    &format!("layer{i}.conv1.weight"),
                    tensor(vec![STEM_CHANNELS, STEM_CHANNELS, 3, 3]),
                );
                artifact.insert(
                    &format!("layer{i}.conv2.weight"),
                    tensor(vec![STEM_CHANNELS, STEM_CHANNELS, 3, 3]),
                );
            }
            STEM_CHANNELS
        }
        ModelFamily::EfficientNet => {
            artifact.insert(
                "features0.dw.weight",
                tensor(vec![STEM_CHANNELS, 1, 3, 3]),
            );
            artifact.insert(
                "features0.pw.weight",
                tensor(vec![16, STEM_CHANNELS, 1, 1]),
            );
            artifact.insert("features1.dw.weight", tensor(vec![16, 1, 3, 3]));
            artifact.insert("features1.pw.weight", tensor(vec![16, 16, 1, 1]));
            16
        }
        ModelFamily::MobileNet => {
            artifact.insert(
                "features0.dw.weight",
                tensor(vec![STEM_CHANNELS, 1, 3, 3]),
            );
            artifact.insert(
                "features0.pw.weight",
                tensor(vec![12, STEM_CHANNELS, 1, 1]),
            );
            12
        }
    };

    artifact.insert(
        family.head_weight_key(),
        tensor(vec![num_classes, feature_channels]),
    );
    artifact.insert(family.head_bias_key(), tensor(vec![num_classes]));

    artifact
}
