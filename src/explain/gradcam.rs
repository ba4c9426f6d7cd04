//! Gradient-weighted class activation mapping and explanation synthesis.

use std::path::Path;

use image::{imageops::FilterType, GrayImage, Rgb, RgbImage};
use ndarray::{Array1, Array2, Array3};

use super::artifact::{load_class_names, Artifact};
use super::errors::{ExplainError, ExplainResult};
use super::family::ModelFamily;
use super::network::{Capture, Model};

/// Network input resolution
const INPUT_SIZE: u32 = 224;
/// Blend weights for the overlay (tunable, not a contract)
const ORIGINAL_WEIGHT: f32 = 0.6;
const HEATMAP_WEIGHT: f32 = 0.4;
/// High-intensity cutoff for the activation-spread measure
const SPREAD_THRESHOLD: u8 = 200;

/// Result of one explain call. Stateless, not persisted.
#[derive(Debug)]
pub struct HeatmapResult {
    /// Predicted class index (arg-max over class scores)
    pub predicted_class: usize,
    /// Human-readable class name, or `Class N` without a sidecar
    pub class_label: String,
    /// Softmax probability of the predicted class, in `[0, 1]`
    pub confidence: f32,
    /// One-paragraph natural-language rationale
    pub explanation: String,
    /// Heatmap alpha-composited over the original image
    pub overlay: RgbImage,
}

/// Qualitative band for the activation spread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusBand {
    /// More than 30% of pixels above threshold
    Widespread,
    /// 15-30%
    Concentrated,
    /// Under 15%
    Localized,
}

impl FocusBand {
    /// Band name used in the explanation text
    pub fn label(&self) -> &'static str {
        match self {
            FocusBand::Widespread => "widespread",
            FocusBand::Concentrated => "concentrated",
            FocusBand::Localized => "localized",
        }
    }

    fn focus_area(&self) -> &'static str {
        match self {
            FocusBand::Widespread => "multiple distributed regions across the image",
            FocusBand::Concentrated => "specific concentrated areas",
            FocusBand::Localized => "highly localized features",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            FocusBand::Widespread => "complex, widespread features",
            FocusBand::Concentrated => "distinctive structural patterns",
            FocusBand::Localized => "fine-grained details",
        }
    }
}

/// Map an activation-spread percentage to its qualitative band.
pub fn focus_band(spread_percent: f64) -> FocusBand {
    if spread_percent > 30.0 {
        FocusBand::Widespread
    } else if spread_percent > 15.0 {
        FocusBand::Concentrated
    } else {
        FocusBand::Localized
    }
}

/// Explain a prediction: Grad-CAM overlay plus textual rationale.
///
/// Loads `<family>_model.json` (and, if present, `<family>_classes.json`)
/// from `models_dir`, classifies the image, and derives the heatmap from
/// the gradient-weighted target-layer activations.
pub fn explain(
    image_bytes: &[u8],
    family: ModelFamily,
    models_dir: &Path,
) -> ExplainResult<HeatmapResult> {
    let artifact = Artifact::load(&models_dir.join(family.artifact_file_name()))?;
    if artifact.family != family {
        return Err(ExplainError::MalformedArtifact(format!(
            "artifact is tagged '{}', expected '{}'",
            artifact.family, family
        )));
    }
    let model = Model::from_artifact(&artifact)?;

    let original = image::load_from_memory(image_bytes)
        .map_err(|e| ExplainError::ImageDecode(e.to_string()))?
        .to_rgb8();
    let input = to_input_tensor(&original);

    // Forward + backward through the explicit capture context.
    let mut capture = Capture::new();
    let scores = model.forward(&input, &mut capture);
    let probabilities = softmax(&scores);
    let predicted_class = argmax(&probabilities);
    let confidence = probabilities[predicted_class];
    model.backward(predicted_class, &mut capture)?;

    let cam = match (&capture.activations, &capture.gradients) {
        (Some(activations), Some(gradients)) => weighted_cam(activations, gradients),
        // Unreachable after a successful forward/backward, but never panic.
        _ => {
            return Err(ExplainError::MalformedArtifact(
                "capture context was not populated".to_string(),
            ))
        }
    };

    let (width, height) = original.dimensions();
    let heatmap = resize_heatmap(&cam, width, height);
    let spread = activation_spread(&heatmap);
    let overlay = composite(&original, &heatmap);

    let class_names = load_class_names(models_dir, family);
    let label = class_label(predicted_class, class_names.as_deref());
    let explanation = compose_explanation(&label, confidence, spread);
    let bare_label = class_names
        .as_deref()
        .and_then(|names| names.get(predicted_class).cloned())
        .unwrap_or_else(|| format!("Class {}", predicted_class));

    Ok(HeatmapResult {
        predicted_class,
        class_label: bare_label,
        confidence,
        explanation,
        overlay,
    })
}

/// Gradient-weighted activation map, rectified and max-normalized.
///
/// Channel-wise global-average-pools the gradients into importance
/// weights, sums the weighted activation channels, clips negatives to
/// zero, and divides by the maximum. An all-non-positive map stays
/// uniformly zero; there is no division by a zero maximum.
pub fn weighted_cam(activations: &Array3<f32>, gradients: &Array3<f32>) -> Array2<f32> {
    let (channels, h, w) = activations.dim();
    let spatial = (h * w) as f32;

    let mut cam = Array2::<f32>::zeros((h, w));
    for k in 0..channels {
        let mut weight = 0.0f32;
        for i in 0..h {
            for j in 0..w {
                weight += gradients[[k, i, j]];
            }
        }
        weight /= spatial;

        for i in 0..h {
            for j in 0..w {
                cam[[i, j]] += weight * activations[[k, i, j]];
            }
        }
    }

    cam.mapv_inplace(|v| v.max(0.0));
    let max = cam.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        cam.mapv_inplace(|v| v / max);
    }
    cam
}

/// Image -> `[3, 224, 224]` tensor in `[0, 1]`
fn to_input_tensor(original: &RgbImage) -> Array3<f32> {
    let resized = image::imageops::resize(original, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    Array3::from_shape_fn(
        (3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        |(c, y, x)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    )
}

fn softmax(scores: &Array1<f32>) -> Array1<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = scores.mapv(|s| (s - max).exp());
    let sum: f32 = exps.sum();
    exps / sum
}

fn argmax(values: &Array1<f32>) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Scale the normalized map to `u8` and resize to the original dimensions.
fn resize_heatmap(cam: &Array2<f32>, width: u32, height: u32) -> GrayImage {
    let (h, w) = cam.dim();
    let small = GrayImage::from_fn(w as u32, h as u32, |x, y| {
        image::Luma([(cam[[y as usize, x as usize]] * 255.0).round() as u8])
    });
    image::imageops::resize(&small, width, height, FilterType::Triangle)
}

/// Percentage of heatmap pixels above the high-intensity cutoff
fn activation_spread(heatmap: &GrayImage) -> f64 {
    let total = heatmap.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let hot = heatmap.pixels().filter(|p| p[0] > SPREAD_THRESHOLD).count();
    hot as f64 / total as f64 * 100.0
}

/// Jet-style perceptual color scale for a heatmap intensity
fn jet_color(intensity: u8) -> Rgb<u8> {
    let t = intensity as f32 / 255.0;
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([
        channel(1.5 - (4.0 * t - 3.0).abs()),
        channel(1.5 - (4.0 * t - 2.0).abs()),
        channel(1.5 - (4.0 * t - 1.0).abs()),
    ])
}

/// Alpha-composite the colorized heatmap over the original image.
fn composite(original: &RgbImage, heatmap: &GrayImage) -> RgbImage {
    RgbImage::from_fn(original.width(), original.height(), |x, y| {
        let base = original.get_pixel(x, y);
        let color = jet_color(heatmap.get_pixel(x, y)[0]);
        Rgb([
            blend(base[0], color[0]),
            blend(base[1], color[1]),
            blend(base[2], color[2]),
        ])
    })
}

fn blend(original: u8, heat: u8) -> u8 {
    (original as f32 * ORIGINAL_WEIGHT + heat as f32 * HEATMAP_WEIGHT).round() as u8
}

fn class_label(class_idx: usize, class_names: Option<&[String]>) -> String {
    match class_names.and_then(|names| names.get(class_idx)) {
        Some(name) => format!("'{}'", name),
        None => format!("Class {}", class_idx),
    }
}

fn compose_explanation(label: &str, confidence: f32, spread_percent: f64) -> String {
    let band = focus_band(spread_percent);
    format!(
        "The model classified this image as {} with a confidence score of {:.1}%. \
         The Grad-CAM analysis shows a {} activation pattern: the model focused on {} \
         to make this decision, suggesting it identified {} characteristic of {}. \
         The heatmap overlay highlights these critical areas in red and yellow, \
         indicating where the model's attention was strongest.",
        label,
        confidence * 100.0,
        band.label(),
        band.focus_area(),
        band.pattern(),
        label,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_cam_is_normalized_to_unit_range() {
        let activations = Array3::from_shape_fn((2, 4, 4), |(k, i, j)| (k + i + j) as f32);
        let gradients = Array3::from_elem((2, 4, 4), 0.5);
        let cam = weighted_cam(&activations, &gradients);

        let max = cam.iter().copied().fold(0.0f32, f32::max);
        let min = cam.iter().copied().fold(1.0f32, f32::min);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(min >= 0.0);
    }

    #[test]
    fn test_cam_all_nonpositive_stays_zero() {
        // Positive activations, negative importance weights: everything
        // rectifies to zero and no division by zero happens.
        let activations = Array3::from_elem((2, 4, 4), 1.0);
        let gradients = Array3::from_elem((2, 4, 4), -0.5);
        let cam = weighted_cam(&activations, &gradients);
        assert!(cam.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_focus_band_thresholds() {
        assert_eq!(focus_band(31.0), FocusBand::Widespread);
        assert_eq!(focus_band(20.0), FocusBand::Concentrated);
        assert_eq!(focus_band(5.0), FocusBand::Localized);
        // Boundaries land in the lower band.
        assert_eq!(focus_band(30.0), FocusBand::Concentrated);
        assert_eq!(focus_band(15.0), FocusBand::Localized);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&arr1(&[1.0, 2.0, 3.0]));
        assert!((probs.sum() - 1.0).abs() < 1e-6);
        assert_eq!(argmax(&probs), 2);
    }

    #[test]
    fn test_jet_color_endpoints() {
        // Low intensity is blue-dominated, high intensity red-dominated.
        let cold = jet_color(0);
        let hot = jet_color(255);
        assert!(cold[2] > cold[0]);
        assert!(hot[0] > hot[2]);
    }

    #[test]
    fn test_explanation_names_class_confidence_and_band() {
        let text = compose_explanation("'pneumonia'", 0.917, 42.0);
        assert!(text.contains("'pneumonia'"));
        assert!(text.contains("91.7%"));
        assert!(text.contains("widespread"));
    }

    #[test]
    fn test_class_label_fallback_is_numeric() {
        assert_eq!(class_label(3, None), "Class 3");
        let names = vec!["a".to_string()];
        // Index beyond the list also falls back.
        assert_eq!(class_label(3, Some(&names)), "Class 3");
        assert_eq!(class_label(0, Some(&names)), "'a'");
    }

    #[test]
    fn test_activation_spread_percentage() {
        let heatmap = GrayImage::from_fn(10, 10, |x, _| {
            if x < 2 {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        });
        assert!((activation_spread(&heatmap) - 20.0).abs() < 1e-9);
    }
}
