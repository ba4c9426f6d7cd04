//! Filesystem dataset analyzer.
//!
//! Expects the ImageFolder layout:
//!
//! ```text
//! dataset/
//!     train/<class>/<images>
//!     test/<class>/<images>
//! ```
//!
//! Class counts are summed across splits. Blur is estimated as the variance
//! of a 3x3 Laplacian response over the grayscale image; noise as the pixel
//! standard deviation. Images that fail to decode are skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::pipeline::DatasetStats;

use super::{CollaboratorResult, DatasetAnalyzer};

const SPLITS: [&str; 2] = ["train", "test"];
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Default analyzer implementation over the local filesystem
#[derive(Debug, Default)]
pub struct FsAnalyzer;

impl FsAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetAnalyzer for FsAnalyzer {
    fn analyze(&self, root: &Path) -> CollaboratorResult<DatasetStats> {
        let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut image_paths: Vec<PathBuf> = Vec::new();

        for split in SPLITS {
            let split_path = root.join(split);
            if !split_path.is_dir() {
                continue;
            }

            for class_entry in std::fs::read_dir(&split_path)? {
                let class_dir = class_entry?.path();
                if !class_dir.is_dir() {
                    continue;
                }
                let class_name = class_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();

                let mut count = 0;
                for file_entry in std::fs::read_dir(&class_dir)? {
                    let file_path = file_entry?.path();
                    if is_image_file(&file_path) {
                        count += 1;
                        image_paths.push(file_path);
                    }
                }
                *class_counts.entry(class_name).or_insert(0) += count;
            }
        }

        let (avg_blur, avg_noise) = quality_scores(&image_paths);

        Ok(DatasetStats {
            size: image_paths.len(),
            imbalance_ratio: imbalance_ratio(&class_counts),
            num_classes: class_counts.len(),
            class_dist: class_counts,
            avg_blur,
            avg_noise,
        })
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Max class count over min class count; 1.0 when fewer than two classes.
fn imbalance_ratio(class_counts: &BTreeMap<String, usize>) -> f64 {
    if class_counts.len() < 2 {
        return 1.0;
    }
    let max = class_counts.values().copied().max().unwrap_or(0);
    let min = class_counts.values().copied().min().unwrap_or(0).max(1);
    max as f64 / min as f64
}

/// Mean blur/noise scores over all decodable images; (0.0, 0.0) when none.
fn quality_scores(image_paths: &[PathBuf]) -> (f64, f64) {
    let mut blur_scores = Vec::new();
    let mut noise_scores = Vec::new();

    for path in image_paths {
        let gray = match image::open(path) {
            Ok(img) => img.to_luma8(),
            Err(_) => continue,
        };
        blur_scores.push(laplacian_variance(&gray));
        noise_scores.push(pixel_std_dev(&gray));
    }

    (mean(&blur_scores), mean(&noise_scores))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Variance of the 3x3 Laplacian response. Low values mean blurry.
fn laplacian_variance(gray: &image::GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut responses = Vec::with_capacity(((w - 2) * (h - 2)) as usize);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = gray.get_pixel(x, y)[0] as f64;
            let up = gray.get_pixel(x, y - 1)[0] as f64;
            let down = gray.get_pixel(x, y + 1)[0] as f64;
            let left = gray.get_pixel(x - 1, y)[0] as f64;
            let right = gray.get_pixel(x + 1, y)[0] as f64;
            responses.push(up + down + left + right - 4.0 * center);
        }
    }

    let m = mean(&responses);
    responses.iter().map(|r| (r - m) * (r - m)).sum::<f64>() / responses.len() as f64
}

fn pixel_std_dev(gray: &image::GrayImage) -> f64 {
    let pixels: Vec<f64> = gray.pixels().map(|p| p[0] as f64).collect();
    if pixels.is_empty() {
        return 0.0;
    }
    let m = mean(&pixels);
    (pixels.iter().map(|p| (p - m) * (p - m)).sum::<f64>() / pixels.len() as f64).sqrt()
}
