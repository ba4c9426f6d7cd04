//! Closed set of supported model families.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ExplainError;

/// Supported architecture families.
///
/// A closed enum rather than open string dispatch: every family carries a
/// total mapping to its artifact file names, head parameter keys, and
/// feature-block structure, checked exhaustively at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Resnet,
    EfficientNet,
    MobileNet,
}

impl ModelFamily {
    /// All families, in a stable order
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Resnet,
        ModelFamily::EfficientNet,
        ModelFamily::MobileNet,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Resnet => "resnet",
            ModelFamily::EfficientNet => "efficientnet",
            ModelFamily::MobileNet => "mobilenet",
        }
    }

    /// File name of the learned-parameter artifact
    pub fn artifact_file_name(&self) -> String {
        format!("{}_model.json", self.as_str())
    }

    /// File name of the persisted class-name list
    pub fn classes_file_name(&self) -> String {
        format!("{}_classes.json", self.as_str())
    }

    /// Artifact key of the output-layer weight. Its leading dimension is
    /// the class count.
    pub fn head_weight_key(&self) -> &'static str {
        match self {
            ModelFamily::Resnet => "fc.weight",
            ModelFamily::EfficientNet | ModelFamily::MobileNet => "classifier.1.weight",
        }
    }

    /// Artifact key of the output-layer bias
    pub fn head_bias_key(&self) -> &'static str {
        match self {
            ModelFamily::Resnet => "fc.bias",
            ModelFamily::EfficientNet | ModelFamily::MobileNet => "classifier.1.bias",
        }
    }

    /// Whether the feature extractor is built from residual blocks
    /// (`layer<i>.*`) or depthwise-separable blocks (`features<i>.*`).
    pub fn uses_residual_blocks(&self) -> bool {
        matches!(self, ModelFamily::Resnet)
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resnet" => Ok(ModelFamily::Resnet),
            "efficientnet" => Ok(ModelFamily::EfficientNet),
            "mobilenet" => Ok(ModelFamily::MobileNet),
            other => Err(ExplainError::UnsupportedFamily(other.to_string())),
        }
    }
}
