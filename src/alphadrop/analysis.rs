//! Image statistics used to pick a removal method and score results.

use std::fmt;
use std::str::FromStr;

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::edges::canny;
use log::debug;

use crate::alphadrop::convert_color::{gray_image, Hsl, HSL_CHANNEL_MAX, HUE_RANGE};
use crate::alphadrop::pipeline::RefineMode;
use crate::error::{MatteError, MatteResult};
use crate::utils::validate_non_empty_image;

/// Mean channel entropy below this suggests a uniform background
pub const ENTROPY_THRESHOLD: f32 = 4.5;
/// Histogram bins per HSL channel
pub const HISTOGRAM_BINS: usize = 32;
/// Canny hysteresis thresholds
pub const CANNY_LOW: f32 = 100.0;
pub const CANNY_HIGH: f32 = 200.0;

/// Background removal strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalMethod {
    /// Border-colour heuristic, no model
    Color,
    /// Model mask with soft refinement
    Matting,
    /// Model mask with hard refinement
    Segmentation,
}

impl RemovalMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Matting => "matting",
            Self::Segmentation => "segmentation",
        }
    }

    /// Refinement mode of a model-based method
    #[must_use]
    pub const fn refine_mode(&self) -> Option<RefineMode> {
        match self {
            Self::Color => None,
            Self::Matting => Some(RefineMode::Soft),
            Self::Segmentation => Some(RefineMode::Hard),
        }
    }
}

impl fmt::Display for RemovalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemovalMethod {
    type Err = MatteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(Self::Color),
            "matting" => Ok(Self::Matting),
            "segmentation" => Ok(Self::Segmentation),
            other => Err(MatteError::InvalidParameter(format!(
                "unknown removal method {other:?}"
            ))),
        }
    }
}

/// Thresholds of the automatic method selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub entropy_threshold: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            entropy_threshold: ENTROPY_THRESHOLD,
        }
    }
}

impl AnalyzerConfig {
    /// Colour when the palette is small, segmentation otherwise
    ///
    /// Edge density is reported alongside but does not steer the choice.
    #[must_use]
    pub fn recommend(&self, color_entropy: f32) -> RemovalMethod {
        if color_entropy < self.entropy_threshold {
            RemovalMethod::Color
        } else {
            RemovalMethod::Segmentation
        }
    }

    /// Measures `image` and recommends a method
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DegenerateImage` for an image with a zero side.
    pub fn analyze(&self, image: &Image<Rgba<u8>>) -> MatteResult<ImageAnalysis> {
        validate_non_empty_image(image.width(), image.height())?;

        let color_entropy = color_entropy(image);
        let edge_density = edge_density(image);
        let recommended = self.recommend(color_entropy);
        debug!("Entropy {color_entropy:.3}, edge density {edge_density:.3} -> {recommended}");

        Ok(ImageAnalysis {
            color_entropy,
            edge_density,
            recommended,
        })
    }
}

/// Measured image statistics and the method they point to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageAnalysis {
    /// Mean Shannon entropy (bits) of the H, S and L histograms
    pub color_entropy: f32,
    /// Fraction of Canny edge pixels
    pub edge_density: f32,
    pub recommended: RemovalMethod,
}

/// Analyses `image` with the default thresholds
///
/// # Errors
///
/// Returns `MatteError::DegenerateImage` for an image with a zero side.
pub fn analyze(image: &Image<Rgba<u8>>) -> MatteResult<ImageAnalysis> {
    AnalyzerConfig::default().analyze(image)
}

/// Mean entropy of 32-bin hue, saturation and lightness histograms
///
/// 0 for a single colour, at most 5 bits.
#[must_use]
pub fn color_entropy(image: &Image<Rgba<u8>>) -> f32 {
    let mut histograms = [[0u64; HISTOGRAM_BINS]; 3];
    for Rgba([r, g, b, _]) in image.pixels() {
        let hsl = Hsl::from_rgb([*r, *g, *b]);
        let channels = [
            hsl.hue / HUE_RANGE,
            hsl.saturation / HSL_CHANNEL_MAX,
            hsl.lightness / HSL_CHANNEL_MAX,
        ];
        for (histogram, value) in histograms.iter_mut().zip(channels) {
            histogram[histogram_bin(value)] += 1;
        }
    }

    let total = image.pixels().len() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let sum: f64 = histograms
        .iter()
        .map(|histogram| {
            histogram
                .iter()
                .filter(|&&count| count > 0)
                .map(|&count| {
                    let p = count as f64 / total;
                    -p * p.log2()
                })
                .sum::<f64>()
        })
        .sum();
    (sum / 3.0) as f32
}

#[inline]
fn histogram_bin(unit: f32) -> usize {
    ((unit.clamp(0.0, 1.0) * HISTOGRAM_BINS as f32) as usize).min(HISTOGRAM_BINS - 1)
}

/// Fraction of pixels Canny marks as edges on the luminance
#[must_use]
pub fn edge_density(image: &Image<Rgba<u8>>) -> f32 {
    edge_ratio(&gray_image(image))
}

fn edge_ratio(gray: &Image<Luma<u8>>) -> f32 {
    let total = gray.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let edges = canny(gray, CANNY_LOW, CANNY_HIGH);
    edges.pixels().filter(|p| p[0] > 0).count() as f32 / total as f32
}

/// Share of pixels with alpha above 127
#[must_use]
pub fn foreground_ratio(alpha: &Image<Luma<u8>>) -> f32 {
    let total = alpha.pixels().len();
    if total == 0 {
        return 0.0;
    }
    alpha.pixels().filter(|p| p[0] > 127).count() as f32 / total as f32
}

/// Confidence of a colour-heuristic mask
///
/// Rewards a plausible foreground share and a clean, low-noise outline.
#[must_use]
pub fn color_confidence(mask: &Image<Luma<u8>>) -> f32 {
    let ratio = foreground_ratio(mask);
    let ratio_score: f32 = if !(0.05..=0.95).contains(&ratio) {
        0.3
    } else if (0.1..=0.9).contains(&ratio) {
        1.0
    } else {
        0.7
    };
    let edge_score = 10.0f32.mul_add(-edge_ratio(mask), 1.0).max(0.3);
    ratio_score.mul_add(0.6, edge_score * 0.4).clamp(0.0, 1.0)
}

/// Confidence of a soft matte; soft edges earn a small bonus
#[must_use]
pub fn matting_confidence(alpha: &Image<Luma<u8>>) -> f32 {
    let total = alpha.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let ratio = foreground_ratio(alpha);
    let base: f32 = if (0.05..=0.98).contains(&ratio) { 0.85 } else { 0.4 };
    let soft = alpha.pixels().filter(|p| (10..=245).contains(&p[0])).count() as f32 / total as f32;
    (base + (2.0 * soft).min(0.15)).min(1.0)
}

/// Confidence of a hard segmentation
#[must_use]
pub fn segmentation_confidence(alpha: &Image<Luma<u8>>) -> f32 {
    let ratio = foreground_ratio(alpha);
    if !(0.03..=0.97).contains(&ratio) {
        0.3
    } else if (0.05..=0.9).contains(&ratio) {
        0.9
    } else {
        0.7
    }
}
