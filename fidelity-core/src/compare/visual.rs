// Pixel-level comparison of two full-page screenshots

use super::Comparator;
use crate::config::VisualConfig;
use crate::result::{ComparisonResult, Modality};
use crate::snapshot::SiteSnapshot;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use tracing::{debug, warn};

const SSIM_WEIGHT: f64 = 0.5;
const MSE_WEIGHT: f64 = 0.3;
const HISTOGRAM_WEIGHT: f64 = 0.2;

/// Largest possible per-pixel squared error for 8-bit samples.
const MAX_MSE: f64 = 255.0 * 255.0;

const SSIM_WINDOW: u32 = 7;
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
const SSIM_RANGE: f64 = 255.0;

/// Scores two encoded screenshots by structural similarity, pixel error and
/// colour distribution.
///
/// Both images are resampled to a shared canvas of `canvas_width` by the
/// taller of the two heights before any pixel metric is taken. The colour
/// histogram uses the original images.
#[derive(Debug, Clone)]
pub struct VisualComparator {
    canvas_width: u32,
}

impl VisualComparator {
    pub fn new(config: &VisualConfig) -> Self {
        Self {
            canvas_width: config.canvas_width.max(1),
        }
    }

    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    pub fn compare_images(&self, source: &[u8], target: &[u8]) -> ComparisonResult {
        let source_image = match decode("source", source) {
            Ok(image) => image,
            Err(result) => return result,
        };
        let target_image = match decode("target", target) {
            Ok(image) => image,
            Err(result) => return result,
        };

        let canvas_width = self.canvas_width;
        let canvas_height = source_image.height().max(target_image.height());

        let source_canvas = to_canvas(&source_image, canvas_width, canvas_height);
        let target_canvas = to_canvas(&target_image, canvas_width, canvas_height);

        let ssim = structural_similarity(&source_canvas, &target_canvas);
        let mse = mean_squared_error(&source_canvas, &target_canvas);
        let normalized_mse = (1.0 - mse / MAX_MSE).max(0.0);
        let color_similarity = histogram_similarity(&source_image, &target_image);

        let score = SSIM_WEIGHT * ssim.clamp(0.0, 1.0)
            + MSE_WEIGHT * normalized_mse
            + HISTOGRAM_WEIGHT * color_similarity;

        debug!(
            "Visual: ssim {:.4}, mse {:.2}, histogram {:.4} on {}x{} canvas",
            ssim, mse, color_similarity, canvas_width, canvas_height
        );

        ComparisonResult::new(score)
            .with_detail("ssim", ssim)
            .with_detail("mse", mse)
            .with_detail("normalized_mse", normalized_mse)
            .with_detail("color_similarity", color_similarity)
            .with_detail("canvas_width", canvas_width)
            .with_detail("canvas_height", canvas_height)
            .with_detail(
                "source_dimensions",
                format!("{}x{}", source_image.width(), source_image.height()),
            )
            .with_detail(
                "target_dimensions",
                format!("{}x{}", target_image.width(), target_image.height()),
            )
    }
}

impl Comparator for VisualComparator {
    fn modality(&self) -> Modality {
        Modality::Visual
    }

    fn compare(&self, source: &SiteSnapshot, target: &SiteSnapshot) -> ComparisonResult {
        self.compare_images(&source.screenshot, &target.screenshot)
    }
}

fn decode(side: &str, bytes: &[u8]) -> Result<DynamicImage, ComparisonResult> {
    match image::load_from_memory(bytes) {
        Ok(image) if image.width() > 0 && image.height() > 0 => Ok(image),
        Ok(_) => {
            warn!("The {} screenshot has no pixels", side);
            Err(ComparisonResult::failed(
                0.0,
                format!("{} screenshot has no pixels", side),
            ))
        }
        Err(e) => {
            warn!("Failed to decode {} screenshot: {}", side, e);
            Err(ComparisonResult::failed(
                0.0,
                format!("failed to decode {} screenshot: {}", side, e),
            ))
        }
    }
}

fn to_canvas(image: &DynamicImage, width: u32, height: u32) -> GrayImage {
    image
        .resize_exact(width, height, FilterType::CatmullRom)
        .to_luma8()
}

/// Mean SSIM over every fully contained window.
///
/// The window is 7x7, shrunk to the largest odd size that fits when the
/// canvas is smaller. Sums are kept per column and slid down the image one
/// row at a time, so memory stays proportional to the canvas width.
pub(crate) fn structural_similarity(a: &GrayImage, b: &GrayImage) -> f64 {
    let (width, height) = a.dimensions();
    debug_assert_eq!((width, height), b.dimensions());

    let mut window = SSIM_WINDOW.min(width).min(height);
    if window % 2 == 0 {
        window -= 1;
    }
    if window == 0 {
        return 0.0;
    }

    let w = width as usize;
    let win = window as usize;
    let samples = (win * win) as f64;
    let cov_norm = if win > 1 { samples / (samples - 1.0) } else { 1.0 };
    let c1 = (SSIM_K1 * SSIM_RANGE).powi(2);
    let c2 = (SSIM_K2 * SSIM_RANGE).powi(2);

    let pa = a.as_raw();
    let pb = b.as_raw();

    // Column sums of x, y, x^2, y^2 and xy over the current band of rows.
    let mut columns = vec![[0u64; 5]; w];
    for row in 0..win {
        let span = row * w..(row + 1) * w;
        accumulate_row(&mut columns, &pa[span.clone()], &pb[span], true);
    }

    let mut total = 0.0;
    let mut windows = 0u64;
    let bands = height as usize - win + 1;

    for top in 0..bands {
        if top > 0 {
            let old = (top - 1) * w;
            let new = (top + win - 1) * w;
            accumulate_row(&mut columns, &pa[old..old + w], &pb[old..old + w], false);
            accumulate_row(&mut columns, &pa[new..new + w], &pb[new..new + w], true);
        }

        let mut sums = [0u64; 5];
        for column in &columns[..win] {
            for (sum, value) in sums.iter_mut().zip(column) {
                *sum += value;
            }
        }

        for left in 0..(w - win + 1) {
            if left > 0 {
                let entering = &columns[left + win - 1];
                let leaving = &columns[left - 1];
                for ((sum, add), sub) in sums.iter_mut().zip(entering).zip(leaving) {
                    *sum = *sum + add - sub;
                }
            }

            let mean_x = sums[0] as f64 / samples;
            let mean_y = sums[1] as f64 / samples;
            let var_x = (sums[2] as f64 / samples - mean_x * mean_x) * cov_norm;
            let var_y = (sums[3] as f64 / samples - mean_y * mean_y) * cov_norm;
            let cov_xy = (sums[4] as f64 / samples - mean_x * mean_y) * cov_norm;

            let numerator = (2.0 * mean_x * mean_y + c1) * (2.0 * cov_xy + c2);
            let denominator = (mean_x * mean_x + mean_y * mean_y + c1) * (var_x + var_y + c2);
            total += numerator / denominator;
            windows += 1;
        }
    }

    total / windows as f64
}

fn accumulate_row(columns: &mut [[u64; 5]], row_a: &[u8], row_b: &[u8], add: bool) {
    for ((column, &va), &vb) in columns.iter_mut().zip(row_a).zip(row_b) {
        let (va, vb) = (va as u64, vb as u64);
        let terms = [va, vb, va * va, vb * vb, va * vb];
        for (sum, term) in column.iter_mut().zip(terms) {
            if add {
                *sum += term;
            } else {
                *sum -= term;
            }
        }
    }
}

pub(crate) fn mean_squared_error(a: &GrayImage, b: &GrayImage) -> f64 {
    let pixels = a.as_raw().len();
    if pixels == 0 {
        return 0.0;
    }
    let sum: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| {
            let d = (*x as i64 - *y as i64).unsigned_abs();
            d * d
        })
        .sum();
    sum as f64 / pixels as f64
}

/// Per-channel RGB histograms compared as `1 - sum((a-b)^2) / (sum(a^2) + sum(b^2))`.
pub(crate) fn histogram_similarity(a: &DynamicImage, b: &DynamicImage) -> f64 {
    let hist_a = rgb_histogram(a);
    let hist_b = rgb_histogram(b);

    let mut diff = 0.0;
    let mut norm = 0.0;
    for (x, y) in hist_a.iter().zip(hist_b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        diff += (x - y) * (x - y);
        norm += x * x + y * y;
    }

    if norm == 0.0 {
        return 0.0;
    }
    (1.0 - diff / norm).max(0.0)
}

fn rgb_histogram(image: &DynamicImage) -> Vec<u64> {
    let mut bins = vec![0u64; 768];
    for pixel in image.to_rgb8().pixels() {
        let [r, g, b] = pixel.0;
        bins[r as usize] += 1;
        bins[256 + g as usize] += 1;
        bins[512 + b as usize] += 1;
    }
    bins
}
