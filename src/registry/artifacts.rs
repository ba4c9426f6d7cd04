//! Listing of trained model artifacts on disk.

use std::fs;
use std::path::Path;

use serde::Serialize;

/// One trained model artifact as surfaced by the models endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    /// Model family name, e.g. `resnet`
    pub name: String,
    /// Absolute or configured path to the artifact file
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// Scan `models_dir` for model artifacts.
///
/// Only files ending in `_model.json` count; class-name sidecars and
/// anything else are ignored. Each entry is reported under its bare family
/// name. A missing or unreadable directory yields an empty list rather than
/// an error. Entries are sorted by name.
pub fn list_artifacts(models_dir: &Path) -> Vec<ArtifactEntry> {
    let entries = match fs::read_dir(models_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut artifacts: Vec<ArtifactEntry> = entries
        .flatten()
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let family = file_name.strip_suffix("_model.json")?;
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(ArtifactEntry {
                name: family.to_string(),
                path: entry.path().to_string_lossy().into_owned(),
                size: metadata.len(),
            })
        })
        .collect();

    artifacts.sort_by(|a, b| a.name.cmp(&b.name));
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dir_yields_empty_list() {
        assert!(list_artifacts(Path::new("/no/such/models")).is_empty());
    }

    #[test]
    fn test_only_model_files_are_listed_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resnet_model.json"), b"{}").unwrap();
        fs::write(dir.path().join("efficientnet_model.json"), b"{}").unwrap();
        fs::write(dir.path().join("resnet_classes.json"), b"[]").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let artifacts = list_artifacts(dir.path());
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["efficientnet", "resnet"]);
        assert!(artifacts.iter().all(|a| a.path.ends_with("_model.json")));
        assert!(artifacts.iter().all(|a| a.size == 2));
    }
}
