//! Rule-based decision service.
//!
//! Stands in for the hosted decision service. Applies the documented
//! augmentation and model-selection rules to the statistics record and
//! returns the decision as raw JSON text, which the calling stage parses
//! (and may reject, falling back, exactly as with the real service).

use serde_json::json;

use crate::pipeline::DatasetStats;

use super::{CollaboratorResult, DecisionService};

/// Deterministic advisor applying fixed planning/selection rules
#[derive(Debug, Default)]
pub struct RuleBasedAdvisor;

impl RuleBasedAdvisor {
    pub fn new() -> Self {
        Self
    }
}

impl DecisionService for RuleBasedAdvisor {
    fn plan_augmentation(&self, stats: &DatasetStats) -> CollaboratorResult<String> {
        // Small datasets rotate more aggressively; blurry ones less.
        let mut rotation = 15;
        let mut flip = false;
        let mut color_jitter = "medium";

        if stats.imbalance_ratio > 3.0 {
            flip = true;
        }
        if stats.avg_blur > 10.0 {
            rotation = 10;
            color_jitter = "low";
        }
        if stats.avg_noise > 0.15 {
            color_jitter = "none";
        }

        Ok(json!({
            "rotation": rotation,
            "flip": flip,
            "color_jitter": color_jitter,
        })
        .to_string())
    }

    fn select_model(&self, stats: &DatasetStats) -> CollaboratorResult<String> {
        let (family, reason) = if stats.size < 150 {
            ("resnet", "Small dataset: the resnet family trains quickly and generalizes well on few samples.")
        } else if stats.imbalance_ratio > 3.0 {
            ("efficientnet", "Strong class imbalance: the efficientnet family is the most stable under imbalance.")
        } else if stats.avg_noise > 0.20 {
            ("mobilenet", "High noise level: the mobilenet family is robust to low-quality images.")
        } else if stats.avg_blur > 12.0 {
            ("efficientnet", "Blurry images: the efficientnet family generalizes best on degraded inputs.")
        } else {
            ("efficientnet", "No special conditions: the efficientnet family is the default choice.")
        };

        Ok(json!({
            "selected_model": family,
            "reason": reason,
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AugPlan, ColorJitter, ModelSelection};
    use crate::explain::ModelFamily;
    use std::collections::BTreeMap;

    fn stats(size: usize, imbalance: f64, blur: f64, noise: f64) -> DatasetStats {
        DatasetStats {
            size,
            class_dist: BTreeMap::new(),
            imbalance_ratio: imbalance,
            avg_blur: blur,
            avg_noise: noise,
            num_classes: 2,
        }
    }

    #[test]
    fn test_augmentation_output_parses_with_all_fields() {
        let advisor = RuleBasedAdvisor::new();
        let raw = advisor.plan_augmentation(&stats(50, 1.0, 0.0, 0.0)).unwrap();
        let plan: AugPlan = serde_json::from_str(&raw).unwrap();
        assert_eq!(plan.rotation, 15);
        assert!(!plan.flip);
        assert_eq!(plan.color_jitter, ColorJitter::Medium);
    }

    #[test]
    fn test_imbalanced_dataset_gets_flips() {
        let advisor = RuleBasedAdvisor::new();
        let raw = advisor.plan_augmentation(&stats(500, 4.0, 0.0, 0.0)).unwrap();
        let plan: AugPlan = serde_json::from_str(&raw).unwrap();
        assert!(plan.flip);
    }

    #[test]
    fn test_blurry_dataset_reduces_rotation() {
        let advisor = RuleBasedAdvisor::new();
        let raw = advisor.plan_augmentation(&stats(500, 1.0, 20.0, 0.0)).unwrap();
        let plan: AugPlan = serde_json::from_str(&raw).unwrap();
        assert!(plan.rotation <= 10);
        assert_eq!(plan.color_jitter, ColorJitter::Low);
    }

    #[test]
    fn test_noisy_dataset_disables_jitter() {
        let advisor = RuleBasedAdvisor::new();
        let raw = advisor.plan_augmentation(&stats(500, 1.0, 0.0, 0.3)).unwrap();
        let plan: AugPlan = serde_json::from_str(&raw).unwrap();
        assert_eq!(plan.color_jitter, ColorJitter::None);
    }

    #[test]
    fn test_selection_boundaries() {
        let advisor = RuleBasedAdvisor::new();
        let cases = [
            (stats(100, 1.0, 0.0, 0.0), ModelFamily::Resnet),
            (stats(500, 5.0, 0.0, 0.0), ModelFamily::EfficientNet),
            (stats(500, 1.0, 0.0, 0.5), ModelFamily::MobileNet),
            (stats(500, 1.0, 15.0, 0.0), ModelFamily::EfficientNet),
            (stats(500, 1.0, 0.0, 0.0), ModelFamily::EfficientNet),
        ];
        for (s, expected) in cases {
            let raw = advisor.select_model(&s).unwrap();
            let selection: ModelSelection = serde_json::from_str(&raw).unwrap();
            assert_eq!(selection.selected_model, expected);
            assert!(!selection.reason.is_empty());
        }
    }
}
