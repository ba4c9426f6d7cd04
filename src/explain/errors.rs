//! Explainability error types.

use thiserror::Error;

/// Result type for explainability operations
pub type ExplainResult<T> = Result<T, ExplainError>;

/// Per-call explainability failures. Reported to the caller as structured
/// errors; never allowed to take down the registry or the feed.
#[derive(Debug, Clone, Error)]
pub enum ExplainError {
    /// Model family name not in the closed set
    #[error("Unsupported model family: {0}")]
    UnsupportedFamily(String),

    /// Artifact file missing or unreadable
    #[error("Failed to load model artifact: {0}")]
    Load(String),

    /// Artifact present but structurally wrong (missing tensors, bad shapes)
    #[error("Malformed model artifact: {0}")]
    MalformedArtifact(String),

    /// Input image could not be decoded
    #[error("Could not decode input image: {0}")]
    ImageDecode(String),
}
