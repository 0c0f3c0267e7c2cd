//! Gradient-aware feathering of mask transitions.
//!
//! Only pixels on a mask transition, or pixels the model was unsure about,
//! are touched. Their blur radius shrinks where the guide has a strong edge
//! so real object boundaries stay crisp while soft regions get smoothed.

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::gradients::sobel_gradients;
use imageproc::map::map_colors;

use crate::alphadrop::convert_color::gray_image;
use crate::error::MatteResult;
use crate::utils::{four_neighbors, validate_matching_dimensions, DIVISION_EPSILON};

/// A 4-neighbour difference above this marks a mask edge
pub const EDGE_DIFFERENCE: f32 = 0.1;
/// Uncertainty above this marks a pixel for feathering
pub const UNCERTAINTY_THRESHOLD: f32 = 0.5;
/// How strongly a full-strength gradient shrinks the feather radius
pub const GRADIENT_ATTENUATION: f32 = 0.7;

/// Sobel gradient magnitude of the guide luminance, normalised to [0, 1]
///
/// A flat guide yields an all-zero map.
#[must_use]
pub fn sobel_magnitude(guide: &Image<Rgba<u8>>) -> Image<Luma<f32>> {
    let gradients = sobel_gradients(&gray_image(guide));
    let max = gradients.pixels().map(|p| p[0]).max().unwrap_or(0);
    let scale = f32::from(max).max(DIVISION_EPSILON);
    map_colors(&gradients, |Luma([g])| Luma([(f32::from(g) / scale).min(1.0)]))
}

/// Per-pixel model uncertainty, `1 - |2p - 1|`
///
/// 0 for a confident 0 or 1, 1 for a coin-flip 0.5.
#[must_use]
pub fn uncertainty_map(mask: &Image<Luma<f32>>) -> Image<Luma<f32>> {
    map_colors(mask, |Luma([p])| {
        Luma([(1.0 - 2.0f32.mul_add(p, -1.0).abs()).clamp(0.0, 1.0)])
    })
}

/// Whether a mask pixel differs from any 4-neighbour by more than `threshold`
#[must_use]
pub fn is_mask_edge(mask: &Image<Luma<f32>>, x: u32, y: u32, threshold: f32) -> bool {
    let (width, height) = mask.dimensions();
    let value = mask.get_pixel(x, y)[0];
    four_neighbors(x, y, width, height).any(|(nx, ny)| (mask.get_pixel(nx, ny)[0] - value).abs() > threshold)
}

/// Feathering with a gradient-modulated, linearly falling-off window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientFeather {
    radius: u32,
}

impl GradientFeather {
    /// Creates a feather with the given base radius; 0 disables it
    #[must_use]
    pub const fn new(radius: u32) -> Self {
        Self { radius }
    }

    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Radius used at a pixel with normalised gradient `gradient`
    #[must_use]
    pub fn adaptive_radius(&self, gradient: f32) -> u32 {
        let scaled = self.radius as f32 * gradient.clamp(0.0, 1.0).mul_add(-GRADIENT_ATTENUATION, 1.0);
        scaled.round().max(0.0) as u32
    }

    /// Feathers mask edges and uncertain pixels
    ///
    /// Every pixel reads from the unmodified input, so results do not depend
    /// on visiting order.
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DimensionMismatch` if the gradient or uncertainty
    /// map differs in size from the mask.
    pub fn apply(
        &self,
        mask: &Image<Luma<f32>>,
        gradient: &Image<Luma<f32>>,
        uncertainty: &Image<Luma<f32>>,
    ) -> MatteResult<Image<Luma<f32>>> {
        validate_matching_dimensions(mask, gradient)?;
        validate_matching_dimensions(mask, uncertainty)?;

        if self.radius == 0 {
            return Ok(mask.clone());
        }

        Ok(Image::from_fn(mask.width(), mask.height(), |x, y| {
            let original = *mask.get_pixel(x, y);
            let uncertain = uncertainty.get_pixel(x, y)[0] > UNCERTAINTY_THRESHOLD;
            if !uncertain && !is_mask_edge(mask, x, y, EDGE_DIFFERENCE) {
                return original;
            }

            let radius = self.adaptive_radius(gradient.get_pixel(x, y)[0]);
            if radius < 1 {
                return original;
            }
            Luma([radial_average(mask, x, y, radius)])
        }))
    }
}

/// Average over a square window with weight `1 - d / (r + 1)`
fn radial_average(mask: &Image<Luma<f32>>, x: u32, y: u32, radius: u32) -> f32 {
    let (width, height) = mask.dimensions();
    let r = i64::from(radius);
    let falloff = (radius + 1) as f32;

    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for ny in (i64::from(y) - r).max(0)..=(i64::from(y) + r).min(i64::from(height) - 1) {
        for nx in (i64::from(x) - r).max(0)..=(i64::from(x) + r).min(i64::from(width) - 1) {
            let dx = (nx - i64::from(x)) as f32;
            let dy = (ny - i64::from(y)) as f32;
            let weight = (1.0 - dx.hypot(dy) / falloff).max(0.0);
            weighted += weight * mask.get_pixel(nx as u32, ny as u32)[0];
            total += weight;
        }
    }

    if total > DIVISION_EPSILON {
        (weighted / total).clamp(0.0, 1.0)
    } else {
        mask.get_pixel(x, y)[0]
    }
}
