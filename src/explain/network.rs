//! Model reconstruction and forward/backward passes.
//!
//! The network for a family is rebuilt from the artifact's parameter
//! shapes: a stem convolution, a run of feature blocks (residual for the
//! resnet family, depthwise-separable for the others), and a global-average-
//! pool + linear head whose weight's leading dimension fixes the class
//! count. The last feature block is the Grad-CAM target layer; its
//! activation and the class-score gradient at it are recorded in a
//! [`Capture`] passed explicitly through both passes.

use ndarray::{Array1, Array2, Array3, Array4};

use super::artifact::Artifact;
use super::errors::{ExplainError, ExplainResult};
use super::family::ModelFamily;

/// Two-slot capture context for the target layer.
///
/// The forward pass fills `activations`, the backward pass `gradients`;
/// the heatmap step reads both. No global hook registration involved.
#[derive(Debug, Default)]
pub struct Capture {
    /// Target-layer activation `[channels, h, w]`
    pub activations: Option<Array3<f32>>,
    /// Gradient of the class score w.r.t. the target activation
    pub gradients: Option<Array3<f32>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One feature block
#[derive(Debug)]
enum Block {
    /// Two 3x3 convolutions with a skip connection (resnet family)
    Residual {
        conv1: Array4<f32>,
        conv2: Array4<f32>,
    },
    /// Depthwise 3x3 + pointwise 1x1 (efficientnet / mobilenet families)
    Separable {
        depthwise: Array4<f32>,
        pointwise: Array4<f32>,
    },
}

impl Block {
    fn out_channels(&self) -> usize {
        match self {
            Block::Residual { conv2, .. } => conv2.dim().0,
            Block::Separable { pointwise, .. } => pointwise.dim().0,
        }
    }
}

/// A reconstructed classifier: feature extractor plus GAP+linear head
#[derive(Debug)]
pub struct Model {
    family: ModelFamily,
    stem: Array4<f32>,
    blocks: Vec<Block>,
    head_weight: Array2<f32>,
    head_bias: Array1<f32>,
}

impl Model {
    /// Rebuild the architecture from the artifact's parameter shapes.
    pub fn from_artifact(artifact: &Artifact) -> ExplainResult<Self> {
        let family = artifact.family;
        let stem = artifact.tensor("stem.weight")?.to_array4()?;
        if stem.dim().1 != 3 {
            return Err(ExplainError::MalformedArtifact(format!(
                "stem expects 3 input channels, artifact has {}",
                stem.dim().1
            )));
        }

        let mut blocks = Vec::new();
        let mut channels = stem.dim().0;
        let mut index = 0;
        loop {
            let block = if family.uses_residual_blocks() {
                let key1 = format!("layer{index}.conv1.weight");
                let key2 = format!("layer{index}.conv2.weight");
                if !artifact.contains(&key1) {
                    break;
                }
                let conv1 = artifact.tensor(&key1)?.to_array4()?;
                let conv2 = artifact.tensor(&key2)?.to_array4()?;
                if conv1.dim().1 != channels || conv2.dim().0 != channels {
                    return Err(ExplainError::MalformedArtifact(format!(
                        "residual block {} does not preserve {} channels",
                        index, channels
                    )));
                }
                if conv2.dim().1 != conv1.dim().0 {
                    return Err(ExplainError::MalformedArtifact(format!(
                        "residual block {} conv2 expects {} input channels, conv1 produces {}",
                        index,
                        conv2.dim().1,
                        conv1.dim().0
                    )));
                }
                // The skip connection needs spatial dims preserved, which
                // same-padding only guarantees for odd kernels.
                for conv in [&conv1, &conv2] {
                    let (_, _, kh, kw) = conv.dim();
                    if kh % 2 == 0 || kw % 2 == 0 {
                        return Err(ExplainError::MalformedArtifact(format!(
                            "residual block {} has an even {}x{} kernel",
                            index, kh, kw
                        )));
                    }
                }
                Block::Residual { conv1, conv2 }
            } else {
                let dw_key = format!("features{index}.dw.weight");
                let pw_key = format!("features{index}.pw.weight");
                if !artifact.contains(&dw_key) {
                    break;
                }
                let depthwise = artifact.tensor(&dw_key)?.to_array4()?;
                let pointwise = artifact.tensor(&pw_key)?.to_array4()?;
                if depthwise.dim().0 != channels || pointwise.dim().1 != channels {
                    return Err(ExplainError::MalformedArtifact(format!(
                        "feature block {} expects {} input channels",
                        index, channels
                    )));
                }
                Block::Separable {
                    depthwise,
                    pointwise,
                }
            };
            channels = block.out_channels();
            blocks.push(block);
            index += 1;
        }

        if blocks.is_empty() {
            return Err(ExplainError::MalformedArtifact(
                "artifact contains no feature blocks".to_string(),
            ));
        }

        let head_weight = artifact.tensor(family.head_weight_key())?.to_array2()?;
        let head_bias = artifact.tensor(family.head_bias_key())?.to_array1()?;
        if head_weight.ncols() != channels {
            return Err(ExplainError::MalformedArtifact(format!(
                "head weight expects {} feature channels, network produces {}",
                head_weight.ncols(),
                channels
            )));
        }
        if head_bias.len() != head_weight.nrows() {
            return Err(ExplainError::MalformedArtifact(
                "head bias length does not match class count".to_string(),
            ));
        }

        Ok(Self {
            family,
            stem,
            blocks,
            head_weight,
            head_bias,
        })
    }

    /// Class count, inferred from the head weight's leading dimension
    pub fn num_classes(&self) -> usize {
        self.head_weight.nrows()
    }

    /// Family this model was reconstructed for
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Forward pass over a `[3, h, w]` input in `[0, 1]`.
    ///
    /// Records the target-layer activation in `capture` and returns the
    /// raw per-class scores.
    pub fn forward(&self, input: &Array3<f32>, capture: &mut Capture) -> Array1<f32> {
        let mut x = conv2d(input, &self.stem, 2);
        relu_inplace(&mut x);

        for block in &self.blocks {
            x = match block {
                Block::Residual { conv1, conv2 } => {
                    let mut y = conv2d(&x, conv1, 1);
                    relu_inplace(&mut y);
                    let mut y = conv2d(&y, conv2, 1);
                    y += &x;
                    relu_inplace(&mut y);
                    y
                }
                Block::Separable {
                    depthwise,
                    pointwise,
                } => {
                    let mut y = depthwise_conv2d(&x, depthwise);
                    relu_inplace(&mut y);
                    let mut y = conv2d(&y, pointwise, 1);
                    relu_inplace(&mut y);
                    y
                }
            };
        }

        capture.activations = Some(x.clone());

        let gap = global_average_pool(&x);
        self.head_weight.dot(&gap) + &self.head_bias
    }

    /// Backward pass from one class score to the target layer.
    ///
    /// The head is GAP followed by a linear layer, so the gradient of
    /// `score[class]` w.r.t. activation `[k, i, j]` is
    /// `head_weight[class, k] / (h * w)`. Writes the gradient slot of
    /// `capture`; requires a prior `forward` on the same capture.
    pub fn backward(&self, class_idx: usize, capture: &mut Capture) -> ExplainResult<()> {
        let activations = capture.activations.as_ref().ok_or_else(|| {
            ExplainError::MalformedArtifact("backward pass requires a forward pass".to_string())
        })?;
        let (channels, h, w) = activations.dim();
        let spatial = (h * w) as f32;

        let gradients = Array3::from_shape_fn((channels, h, w), |(k, _, _)| {
            self.head_weight[[class_idx, k]] / spatial
        });
        capture.gradients = Some(gradients);
        Ok(())
    }
}

/// Plain 2-D convolution, same-padding for odd kernels, square stride.
fn conv2d(input: &Array3<f32>, weight: &Array4<f32>, stride: usize) -> Array3<f32> {
    let (_, in_h, in_w) = input.dim();
    let (out_c, in_c, kh, kw) = weight.dim();
    let pad_h = kh / 2;
    let pad_w = kw / 2;
    let out_h = (in_h + 2 * pad_h - kh) / stride + 1;
    let out_w = (in_w + 2 * pad_w - kw) / stride + 1;

    let mut output = Array3::zeros((out_c, out_h, out_w));
    for oc in 0..out_c {
        for oy in 0..out_h {
            for ox in 0..out_w {
                let mut acc = 0.0f32;
                for ic in 0..in_c {
                    for ky in 0..kh {
                        let iy = (oy * stride + ky) as isize - pad_h as isize;
                        if iy < 0 || iy >= in_h as isize {
                            continue;
                        }
                        for kx in 0..kw {
                            let ix = (ox * stride + kx) as isize - pad_w as isize;
                            if ix < 0 || ix >= in_w as isize {
                                continue;
                            }
                            acc += input[[ic, iy as usize, ix as usize]]
                                * weight[[oc, ic, ky, kx]];
                        }
                    }
                }
                output[[oc, oy, ox]] = acc;
            }
        }
    }
    output
}

/// Depthwise convolution: weight `[channels, 1, kh, kw]`, one filter per
/// input channel, stride 1, same padding.
fn depthwise_conv2d(input: &Array3<f32>, weight: &Array4<f32>) -> Array3<f32> {
    let (channels, in_h, in_w) = input.dim();
    let (_, _, kh, kw) = weight.dim();
    let pad_h = kh / 2;
    let pad_w = kw / 2;

    let mut output = Array3::zeros((channels, in_h, in_w));
    for c in 0..channels {
        for oy in 0..in_h {
            for ox in 0..in_w {
                let mut acc = 0.0f32;
                for ky in 0..kh {
                    let iy = (oy + ky) as isize - pad_h as isize;
                    if iy < 0 || iy >= in_h as isize {
                        continue;
                    }
                    for kx in 0..kw {
                        let ix = (ox + kx) as isize - pad_w as isize;
                        if ix < 0 || ix >= in_w as isize {
                            continue;
                        }
                        acc += input[[c, iy as usize, ix as usize]] * weight[[c, 0, ky, kx]];
                    }
                }
                output[[c, oy, ox]] = acc;
            }
        }
    }
    output
}

fn relu_inplace(x: &mut Array3<f32>) {
    x.mapv_inplace(|v| v.max(0.0));
}

/// Per-channel spatial mean: `[c, h, w]` -> `[c]`
fn global_average_pool(x: &Array3<f32>) -> Array1<f32> {
    let (channels, h, w) = x.dim();
    let spatial = (h * w) as f32;
    Array1::from_shape_fn(channels, |c| {
        let mut sum = 0.0f32;
        for i in 0..h {
            for j in 0..w {
                sum += x[[c, i, j]];
            }
        }
        sum / spatial
    })
}
