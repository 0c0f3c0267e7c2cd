//! Edge-colour decontamination.
//!
//! Semi-transparent pixels carry a mix of foreground colour and whatever
//! background showed through. Their RGB is replaced with the colour of the
//! closest fully opaque pixel so composites onto a new background show no
//! halo. Alpha is never changed.

use image::Rgba;
use imageproc::definitions::Image;

use crate::error::{MatteError, MatteResult};
use crate::utils::DIVISION_EPSILON;

/// Alpha at or below this is treated as pure background
pub const DEFRINGE_LOW_ALPHA: u8 = 5;
/// Alpha at or above this is treated as opaque foreground
pub const DEFRINGE_HIGH_ALPHA: u8 = 250;
/// Chebyshev radius searched for an opaque donor pixel
pub const DEFRINGE_SEARCH_RADIUS: u32 = 10;

/// Defringing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defringe {
    low_alpha: u8,
    high_alpha: u8,
    search_radius: u32,
}

impl Default for Defringe {
    fn default() -> Self {
        Self {
            low_alpha: DEFRINGE_LOW_ALPHA,
            high_alpha: DEFRINGE_HIGH_ALPHA,
            search_radius: DEFRINGE_SEARCH_RADIUS,
        }
    }
}

impl Defringe {
    /// Creates a defringe pass
    ///
    /// # Errors
    ///
    /// Returns `MatteError::InvalidParameter` if `low_alpha >= high_alpha`.
    pub fn new(low_alpha: u8, high_alpha: u8, search_radius: u32) -> MatteResult<Self> {
        if low_alpha >= high_alpha {
            return Err(MatteError::InvalidParameter(format!(
                "defringe low alpha {low_alpha} must be below high alpha {high_alpha}"
            )));
        }
        Ok(Self {
            low_alpha,
            high_alpha,
            search_radius,
        })
    }

    #[must_use]
    pub const fn low_alpha(&self) -> u8 {
        self.low_alpha
    }

    #[must_use]
    pub const fn high_alpha(&self) -> u8 {
        self.high_alpha
    }

    #[must_use]
    pub const fn search_radius(&self) -> u32 {
        self.search_radius
    }

    /// Whether a pixel's colour is a foreground/background mix
    #[inline]
    #[must_use]
    pub const fn is_mixed(&self, alpha: u8) -> bool {
        alpha > self.low_alpha && alpha < self.high_alpha
    }

    /// Replaces the RGB of every mixed pixel
    ///
    /// Donor colours are always read from the input, never from pixels
    /// already rewritten in this pass.
    #[must_use]
    pub fn apply(&self, image: &Image<Rgba<u8>>) -> Image<Rgba<u8>> {
        Image::from_fn(image.width(), image.height(), |x, y| {
            let pixel = *image.get_pixel(x, y);
            let alpha = pixel[3];
            if !self.is_mixed(alpha) {
                return pixel;
            }
            let [r, g, b] = self
                .nearest_opaque(image, x, y)
                .unwrap_or_else(|| self.weighted_fallback(image, x, y));
            Rgba([r, g, b, alpha])
        })
    }

    /// Colour of the Euclidean-nearest opaque pixel within the search window
    ///
    /// Rings are scanned outwards; once a donor is found at squared distance
    /// `d²`, scanning continues only while a closer pixel can still exist.
    fn nearest_opaque(&self, image: &Image<Rgba<u8>>, x: u32, y: u32) -> Option<[u8; 3]> {
        let mut best: Option<(i64, [u8; 3])> = None;

        for ring in 1..=i64::from(self.search_radius) {
            if best.is_some_and(|(distance, _)| ring * ring > distance) {
                break;
            }
            for (nx, ny) in ring_coordinates(x, y, ring, image.dimensions()) {
                let Rgba([r, g, b, a]) = *image.get_pixel(nx, ny);
                if a < self.high_alpha {
                    continue;
                }
                let dx = i64::from(nx) - i64::from(x);
                let dy = i64::from(ny) - i64::from(y);
                let distance = dx * dx + dy * dy;
                if best.is_none_or(|(current, _)| distance < current) {
                    best = Some((distance, [r, g, b]));
                }
            }
        }

        best.map(|(_, color)| color)
    }

    /// Inverse-distance, alpha-weighted average of more opaque neighbours
    ///
    /// Keeps the pixel's own colour when no such neighbour exists.
    fn weighted_fallback(&self, image: &Image<Rgba<u8>>, x: u32, y: u32) -> [u8; 3] {
        let Rgba([r, g, b, alpha]) = *image.get_pixel(x, y);
        let radius = i64::from(self.search_radius);
        let (width, height) = image.dimensions();

        let mut sums = [0.0f32; 3];
        let mut total = 0.0f32;
        for ny in (i64::from(y) - radius).max(0)..=(i64::from(y) + radius).min(i64::from(height) - 1) {
            for nx in (i64::from(x) - radius).max(0)..=(i64::from(x) + radius).min(i64::from(width) - 1) {
                let neighbor = image.get_pixel(nx as u32, ny as u32);
                if neighbor[3] <= alpha {
                    continue;
                }
                let dx = (nx - i64::from(x)) as f32;
                let dy = (ny - i64::from(y)) as f32;
                let weight = f32::from(neighbor[3]) / 255.0 / dx.hypot(dy).max(1.0);
                for (sum, &channel) in sums.iter_mut().zip(&neighbor.0[..3]) {
                    *sum += weight * f32::from(channel);
                }
                total += weight;
            }
        }

        if total < DIVISION_EPSILON {
            return [r, g, b];
        }
        sums.map(|sum| (sum / total).round().clamp(0.0, 255.0) as u8)
    }
}

/// In-bounds coordinates at Chebyshev distance exactly `ring` from `(x, y)`
fn ring_coordinates(
    x: u32,
    y: u32,
    ring: i64,
    (width, height): (u32, u32),
) -> impl Iterator<Item = (u32, u32)> {
    let (cx, cy) = (i64::from(x), i64::from(y));
    (-ring..=ring)
        .flat_map(move |dy| (-ring..=ring).map(move |dx| (dx, dy)))
        .filter(move |&(dx, dy)| dx.abs() == ring || dy.abs() == ring)
        .map(move |(dx, dy)| (cx + dx, cy + dy))
        .filter(move |&(nx, ny)| nx >= 0 && ny >= 0 && nx < i64::from(width) && ny < i64::from(height))
        .map(|(nx, ny)| (nx as u32, ny as u32))
}
