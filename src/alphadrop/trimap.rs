//! Trimap construction and colour-sample matting.
//!
//! The guided mask is split into definite foreground, definite background and
//! an unknown band. Pixels in the unknown band get a colour-based alpha from
//! their distance to sampled foreground and background colours, which is then
//! blended with the mask's own value.

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::map::map_colors;

use crate::alphadrop::morphology::{BorderPolicy, Morphology};
use crate::error::{MatteError, MatteResult};
use crate::utils::{validate_matching_dimensions, DIVISION_EPSILON};

/// Trimap value for definite background
pub const TRIMAP_BACKGROUND: u8 = 0;
/// Trimap value for the unknown band
pub const TRIMAP_UNKNOWN: u8 = 128;
/// Trimap value for definite foreground
pub const TRIMAP_FOREGROUND: u8 = 255;

/// Upper bound on colours sampled from each trimap class
pub const MAX_COLOR_SAMPLES: usize = 1000;
/// Fewer samples than this in either class skips colour matting
pub const MIN_COLOR_SAMPLES: usize = 10;
/// Share of the colour estimate in the final unknown-band alpha
pub const COLOR_BLEND_WEIGHT: f32 = 0.6;
/// Per-channel weights of the colour distance; green counts the most
pub const CHANNEL_WEIGHTS: [f32; 3] = [0.3, 0.59, 0.11];

/// Thresholds and erosion size used to build a trimap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimapParams {
    /// Mask values above this are definite foreground candidates
    pub fg_threshold: f32,
    /// Mask values below this are definite background candidates
    pub bg_threshold: f32,
    /// Erosion radius applied to both candidate regions
    pub erode_size: u32,
}

impl Default for TrimapParams {
    fn default() -> Self {
        Self {
            fg_threshold: 0.95,
            bg_threshold: 0.05,
            erode_size: 6,
        }
    }
}

/// Builds a `{0, 128, 255}` trimap from a float mask
///
/// Foreground candidates erode with an outside value of 0 so they retreat
/// from the frame; background candidates erode with an outside value of 255
/// so they do not retreat from it.
#[must_use]
pub fn build_trimap(mask: &Image<Luma<f32>>, params: &TrimapParams) -> Image<Luma<u8>> {
    let binary = |keep: fn(f32, f32) -> bool, threshold: f32| {
        map_colors(mask, move |Luma([v])| Luma([if keep(v, threshold) { 255 } else { 0 }]))
    };
    let foreground = binary(|v, t| v > t, params.fg_threshold);
    let background = binary(|v, t| v < t, params.bg_threshold);

    let foreground = Morphology::new(params.erode_size, BorderPolicy::Constant(0)).erode(&foreground, 1);
    let background =
        Morphology::new(params.erode_size, BorderPolicy::Constant(255)).erode(&background, 1);

    Image::from_fn(mask.width(), mask.height(), |x, y| {
        if foreground.get_pixel(x, y)[0] == 255 {
            Luma([TRIMAP_FOREGROUND])
        } else if background.get_pixel(x, y)[0] == 255 {
            Luma([TRIMAP_BACKGROUND])
        } else {
            Luma([TRIMAP_UNKNOWN])
        }
    })
}

/// Colours sampled from the definite regions of a trimap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorSamples {
    pub foreground: Vec<[u8; 3]>,
    pub background: Vec<[u8; 3]>,
}

impl ColorSamples {
    /// Samples up to `max_samples` colours per class, evenly spaced in raster order
    #[must_use]
    pub fn collect(trimap: &Image<Luma<u8>>, guide: &Image<Rgba<u8>>, max_samples: usize) -> Self {
        let class_colors = |class: u8| -> Vec<[u8; 3]> {
            let count = trimap.pixels().filter(|p| p[0] == class).count();
            if count == 0 || max_samples == 0 {
                return Vec::new();
            }
            let step = count.div_ceil(max_samples).max(1);
            trimap
                .enumerate_pixels()
                .filter(|(_, _, p)| p[0] == class)
                .step_by(step)
                .take(max_samples)
                .map(|(x, y, _)| {
                    let Rgba([r, g, b, _]) = *guide.get_pixel(x, y);
                    [r, g, b]
                })
                .collect()
        };

        Self {
            foreground: class_colors(TRIMAP_FOREGROUND),
            background: class_colors(TRIMAP_BACKGROUND),
        }
    }

    /// Whether both classes hold at least `MIN_COLOR_SAMPLES` colours
    #[must_use]
    pub fn is_sufficient(&self) -> bool {
        self.foreground.len() >= MIN_COLOR_SAMPLES && self.background.len() >= MIN_COLOR_SAMPLES
    }

    /// Colour-based alpha: distance to background over the summed distances
    #[must_use]
    pub fn color_alpha(&self, rgb: [u8; 3]) -> f32 {
        let to_foreground = nearest_distance(&self.foreground, rgb);
        let to_background = nearest_distance(&self.background, rgb);
        to_background / (to_foreground + to_background + DIVISION_EPSILON)
    }
}

/// Weighted squared distance between two colours
#[inline]
#[must_use]
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    a.iter()
        .zip(b)
        .zip(CHANNEL_WEIGHTS)
        .map(|((&ca, cb), weight)| {
            let diff = f32::from(ca) - f32::from(cb);
            weight * diff * diff
        })
        .sum()
}

fn nearest_distance(samples: &[[u8; 3]], rgb: [u8; 3]) -> f32 {
    samples
        .iter()
        .map(|&sample| color_distance(sample, rgb))
        .fold(f32::INFINITY, f32::min)
}

/// Refines the unknown band of a mask with sampled colours
///
/// The mask and guide must share dimensions: resampling happens before the
/// trimap is built.
///
/// # Errors
///
/// * `MatteError::DimensionMismatch` if the mask and guide differ in size
/// * `MatteError::InsufficientColorSamples` if either class has fewer than
///   `MIN_COLOR_SAMPLES` pixels; callers treat this as a soft fallback
pub fn refine_with_color_samples(
    mask: &Image<Luma<f32>>,
    guide: &Image<Rgba<u8>>,
    params: &TrimapParams,
) -> MatteResult<Image<Luma<f32>>> {
    validate_matching_dimensions(guide, mask)?;

    let trimap = build_trimap(mask, params);
    let samples = ColorSamples::collect(&trimap, guide, MAX_COLOR_SAMPLES);
    if !samples.is_sufficient() {
        return Err(MatteError::InsufficientColorSamples {
            foreground: samples.foreground.len(),
            background: samples.background.len(),
            required: MIN_COLOR_SAMPLES,
        });
    }

    Ok(Image::from_fn(mask.width(), mask.height(), |x, y| {
        let original = mask.get_pixel(x, y)[0];
        if trimap.get_pixel(x, y)[0] != TRIMAP_UNKNOWN {
            return Luma([original]);
        }
        let Rgba([r, g, b, _]) = *guide.get_pixel(x, y);
        let color = samples.color_alpha([r, g, b]);
        let blended = original.mul_add(1.0 - COLOR_BLEND_WEIGHT, color * COLOR_BLEND_WEIGHT);
        Luma([blended.clamp(0.0, 1.0)])
    }))
}
