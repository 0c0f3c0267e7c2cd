use image::{Luma, Rgba};
use imageproc::{definitions::Image, map::map_colors2};

use crate::error::MatteResult;
use crate::utils::validate_matching_dimensions;

/// Writing a mask into the alpha channel of an RGBA image
///
/// Colour channels are preserved as-is; only alpha is replaced.
pub trait ReplaceAlpha: Sized {
    /// Returns a copy of the image with its alpha channel replaced by `mask`
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DimensionMismatch` if the mask size differs.
    fn with_alpha(&self, mask: &Image<Luma<u8>>) -> MatteResult<Self>;

    /// Replaces the alpha channel in place
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DimensionMismatch` if the mask size differs.
    fn replace_alpha_mut(&mut self, mask: &Image<Luma<u8>>) -> MatteResult<&mut Self>;
}

impl ReplaceAlpha for Image<Rgba<u8>> {
    fn with_alpha(&self, mask: &Image<Luma<u8>>) -> MatteResult<Self> {
        validate_matching_dimensions(self, mask)?;

        Ok(map_colors2(self, mask, |Rgba([red, green, blue, _]), Luma([alpha])| {
            Rgba([red, green, blue, alpha])
        }))
    }

    fn replace_alpha_mut(&mut self, mask: &Image<Luma<u8>>) -> MatteResult<&mut Self> {
        validate_matching_dimensions(&*self, mask)?;

        self.pixels_mut()
            .zip(mask.pixels())
            .for_each(|(pixel, Luma([alpha]))| pixel[3] = *alpha);

        Ok(self)
    }
}
