//! Edge-aware mask smoothing with a luminance guide.
//!
//! Linear guided filtering: inside every window the output is modelled as
//! `q = a * L + b`, where `L` is the guide luminance. Where the guide has
//! strong local variance `a` is large and the mask follows the guide's edges;
//! in flat regions `a` is close to zero and the filter degenerates into a box
//! blur of the mask. `epsilon` regularises `a`: small values keep fine detail,
//! large values smooth harder.

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::map::{map_colors, map_colors2};

use crate::alphadrop::box_filter::BoxFilter;
use crate::alphadrop::convert_color::{luminance_image, to_unit_mask};
use crate::error::{MatteError, MatteResult};
use crate::utils::validate_matching_dimensions;

/// Guided filter configured with a window radius and regularisation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidedMaskFilter {
    radius: u32,
    epsilon: f32,
}

impl GuidedMaskFilter {
    /// Creates a guided filter
    ///
    /// # Errors
    ///
    /// Returns `MatteError::InvalidParameter` if `epsilon` is not a positive
    /// finite number.
    pub fn new(radius: u32, epsilon: f32) -> MatteResult<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(MatteError::InvalidParameter(format!(
                "guided filter epsilon must be positive, got {epsilon}"
            )));
        }
        Ok(Self { radius, epsilon })
    }

    /// Window radius
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Regularisation term
    #[must_use]
    pub const fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Filters a float mask using a luminance guide of the same size
    ///
    /// The result is clamped to [0, 1].
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DimensionMismatch` if mask and guide differ in size.
    pub fn filter(
        &self,
        mask: &Image<Luma<f32>>,
        luminance: &Image<Luma<f32>>,
    ) -> MatteResult<Image<Luma<f32>>> {
        validate_matching_dimensions(luminance, mask)?;

        let radius = self.radius;
        let mean_guide = luminance.box_filter_square(radius);
        let mean_mask = mask.box_filter_square(radius);

        let guide_mask = map_colors2(luminance, mask, |Luma([l]), Luma([p])| Luma([l * p]));
        let guide_sq = map_colors(luminance, |Luma([l])| Luma([l * l]));
        let mean_guide_mask = guide_mask.box_filter_square(radius);
        let mean_guide_sq = guide_sq.box_filter_square(radius);

        let (width, height) = mask.dimensions();
        let mut a: Image<Luma<f32>> = Image::new(width, height);
        let mut b: Image<Luma<f32>> = Image::new(width, height);

        for (x, y, &Luma([mean_l])) in mean_guide.enumerate_pixels() {
            let mean_p = mean_mask.get_pixel(x, y)[0];
            let mean_lp = mean_guide_mask.get_pixel(x, y)[0];
            let mean_ll = mean_guide_sq.get_pixel(x, y)[0];

            // cov(L, p) = E[L p] - E[L] E[p], var(L) = E[L²] - E[L]²
            let covariance = mean_l.mul_add(-mean_p, mean_lp);
            let variance = mean_l.mul_add(-mean_l, mean_ll).max(0.0);

            let a_val = covariance / (variance + self.epsilon);
            let b_val = a_val.mul_add(-mean_l, mean_p);

            a.put_pixel(x, y, Luma([a_val]));
            b.put_pixel(x, y, Luma([b_val]));
        }

        let mean_a = a.box_filter_square(radius);
        let mean_b = b.box_filter_square(radius);

        Ok(Image::from_fn(width, height, |x, y| {
            let guide = luminance.get_pixel(x, y)[0];
            let q = mean_a.get_pixel(x, y)[0].mul_add(guide, mean_b.get_pixel(x, y)[0]);
            Luma([if q.is_finite() { q.clamp(0.0, 1.0) } else { mask.get_pixel(x, y)[0] }])
        }))
    }
}

/// Guided filtering of a byte mask with an RGBA guide
pub trait GuidedFilterExt {
    /// Filters the mask along the guide's luminance edges
    ///
    /// Returns a float mask in [0, 1].
    ///
    /// # Errors
    ///
    /// * `MatteError::InvalidParameter` for a non-positive epsilon
    /// * `MatteError::DimensionMismatch` if the guide has a different size
    fn guided_filter(
        &self,
        guide: &Image<Rgba<u8>>,
        radius: u32,
        epsilon: f32,
    ) -> MatteResult<Image<Luma<f32>>>;
}

impl GuidedFilterExt for Image<Luma<u8>> {
    fn guided_filter(
        &self,
        guide: &Image<Rgba<u8>>,
        radius: u32,
        epsilon: f32,
    ) -> MatteResult<Image<Luma<f32>>> {
        let filter = GuidedMaskFilter::new(radius, epsilon)?;
        validate_matching_dimensions(guide, self)?;
        filter.filter(&to_unit_mask(self), &luminance_image(guide))
    }
}
