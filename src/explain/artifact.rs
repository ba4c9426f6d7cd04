//! Persisted model artifact: a JSON container of named weight tensors.
//!
//! One artifact file and one class-name list per trained family, both
//! written by the trainer collaborator and read back here.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array1, Array2, Array4};
use serde::{Deserialize, Serialize};

use super::errors::{ExplainError, ExplainResult};
use super::family::ModelFamily;

/// A single named tensor: row-major data plus its shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorData {
    /// Create a tensor, checking that the data length matches the shape.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    /// View as a 4-D array (conv weights: `[out, in, kh, kw]`)
    pub fn to_array4(&self) -> ExplainResult<Array4<f32>> {
        let dims: [usize; 4] = self
            .shape
            .as_slice()
            .try_into()
            .map_err(|_| malformed(&self.shape, 4))?;
        Array4::from_shape_vec(dims, self.data.clone())
            .map_err(|e| ExplainError::MalformedArtifact(e.to_string()))
    }

    /// View as a 2-D array (linear weights: `[out, in]`)
    pub fn to_array2(&self) -> ExplainResult<Array2<f32>> {
        let dims: [usize; 2] = self
            .shape
            .as_slice()
            .try_into()
            .map_err(|_| malformed(&self.shape, 2))?;
        Array2::from_shape_vec(dims, self.data.clone())
            .map_err(|e| ExplainError::MalformedArtifact(e.to_string()))
    }

    /// View as a 1-D array (biases)
    pub fn to_array1(&self) -> ExplainResult<Array1<f32>> {
        if self.shape.len() != 1 {
            return Err(malformed(&self.shape, 1));
        }
        Ok(Array1::from_vec(self.data.clone()))
    }
}

fn malformed(shape: &[usize], expected_rank: usize) -> ExplainError {
    ExplainError::MalformedArtifact(format!(
        "expected a rank-{} tensor, got shape {:?}",
        expected_rank, shape
    ))
}

/// Learned-parameter container persisted per trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Family the parameters belong to
    pub family: ModelFamily,
    /// Tensor name -> weights
    pub tensors: BTreeMap<String, TensorData>,
}

impl Artifact {
    /// New empty artifact for the given family
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            tensors: BTreeMap::new(),
        }
    }

    /// Insert a tensor under the given key
    pub fn insert(&mut self, key: &str, tensor: TensorData) {
        self.tensors.insert(key.to_string(), tensor);
    }

    /// Fetch a tensor, mapping absence to a malformed-artifact error.
    pub fn tensor(&self, key: &str) -> ExplainResult<&TensorData> {
        self.tensors
            .get(key)
            .ok_or_else(|| ExplainError::MalformedArtifact(format!("missing tensor '{}'", key)))
    }

    /// Whether a tensor with the given key exists
    pub fn contains(&self, key: &str) -> bool {
        self.tensors.contains_key(key)
    }

    /// Load an artifact from disk.
    pub fn load(path: &Path) -> ExplainResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| ExplainError::Load(format!("{}: {}", path.display(), e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ExplainError::MalformedArtifact(format!("{}: {}", path.display(), e)))
    }

    /// Persist the artifact to disk.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Load the persisted class-name list for a family, if present and valid.
///
/// Absence (or any read/parse failure) is not an error: explanations fall
/// back to numeric class labels.
pub fn load_class_names(models_dir: &Path, family: ModelFamily) -> Option<Vec<String>> {
    let path = models_dir.join(family.classes_file_name());
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resnet_model.json");

        let mut artifact = Artifact::new(ModelFamily::Resnet);
        artifact.insert(
            "fc.weight",
            TensorData::new(vec![2, 3], vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
        );
        artifact.save(&path).unwrap();

        let loaded = Artifact::load(&path).unwrap();
        assert_eq!(loaded.family, ModelFamily::Resnet);
        let tensor = loaded.tensor("fc.weight").unwrap();
        assert_eq!(tensor.shape, vec![2, 3]);
        assert_eq!(tensor.to_array2().unwrap()[[1, 2]], 0.6);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = Artifact::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ExplainError::Load(_)));
    }

    #[test]
    fn test_corrupt_file_is_malformed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = Artifact::load(&path).unwrap_err();
        assert!(matches!(err, ExplainError::MalformedArtifact(_)));
    }

    #[test]
    fn test_missing_tensor_is_malformed_error() {
        let artifact = Artifact::new(ModelFamily::MobileNet);
        let err = artifact.tensor("classifier.1.weight").unwrap_err();
        assert!(matches!(err, ExplainError::MalformedArtifact(_)));
    }

    #[test]
    fn test_wrong_rank_is_malformed_error() {
        let tensor = TensorData::new(vec![2, 2], vec![0.0; 4]);
        assert!(tensor.to_array4().is_err());
        assert!(tensor.to_array1().is_err());
        assert!(tensor.to_array2().is_ok());
    }

    #[test]
    fn test_class_names_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_class_names(dir.path(), ModelFamily::Resnet).is_none());
    }

    #[test]
    fn test_class_names_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ModelFamily::Resnet.classes_file_name());
        std::fs::write(&path, r#"["benign", "malignant"]"#).unwrap();

        let names = load_class_names(dir.path(), ModelFamily::Resnet).unwrap();
        assert_eq!(names, vec!["benign", "malignant"]);
    }
}
