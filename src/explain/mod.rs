//! # Explainability Engine
//!
//! Stateless Grad-CAM over persisted model artifacts. Given an image and a
//! model family, reconstructs the network from the artifact's parameter
//! shapes, runs a forward pass, takes the gradient of the predicted class
//! score at the target feature layer, and turns the weighted activations
//! into a heatmap overlay plus a textual rationale.

pub mod artifact;
pub mod errors;
pub mod family;
pub mod gradcam;
pub mod network;

pub use artifact::{Artifact, TensorData};
pub use errors::{ExplainError, ExplainResult};
pub use family::ModelFamily;
pub use gradcam::{explain, focus_band, weighted_cam, FocusBand, HeatmapResult};
pub use network::{Capture, Model};
