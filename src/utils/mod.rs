//! Internal utility functions for alphadrop.
//!
//! Validation and numeric helpers shared by the individual matte stages.

use image::{GenericImageView, ImageBuffer, Pixel};
use imageproc::definitions::Image;

use crate::error::{BufferKind, MatteError, MatteResult};

/// Guard added to every denominator that can reach zero.
pub const DIVISION_EPSILON: f32 = 1e-6;

/// Converts a value in [0, 1] to a byte, rounding and clamping.
///
/// `NaN` maps to 0.
#[inline]
pub fn unit_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Converts a byte to a value in [0, 1].
#[inline]
pub fn u8_to_unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Validates that an image has non-zero dimensions.
pub const fn validate_non_empty_image(width: u32, height: u32) -> MatteResult<()> {
    if width == 0 || height == 0 {
        Err(MatteError::DegenerateImage { width, height })
    } else {
        Ok(())
    }
}

/// Validates that two images have matching dimensions.
pub fn validate_matching_dimensions<I1, I2>(expected: &I1, actual: &I2) -> MatteResult<()>
where
    I1: GenericImageView,
    I2: GenericImageView,
{
    let expected = expected.dimensions();
    let actual = actual.dimensions();
    if expected == actual {
        Ok(())
    } else {
        Err(MatteError::DimensionMismatch { expected, actual })
    }
}

/// Validates that a raw buffer holds exactly `channels` bytes per pixel.
pub fn validate_buffer_len(
    buffer: BufferKind,
    len: usize,
    width: u32,
    height: u32,
    channels: usize,
) -> MatteResult<()> {
    validate_non_empty_image(width, height)?;
    let expected = width as usize * height as usize * channels;
    if len == expected {
        Ok(())
    } else {
        Err(MatteError::InvalidBufferSize {
            buffer,
            width,
            height,
            expected,
            actual: len,
        })
    }
}

/// Builds an owned image from a raw slice after validating its length.
pub fn image_from_slice<P>(
    buffer: BufferKind,
    data: &[u8],
    width: u32,
    height: u32,
) -> MatteResult<Image<P>>
where
    P: Pixel<Subpixel = u8>,
{
    validate_buffer_len(buffer, data.len(), width, height, P::CHANNEL_COUNT as usize)?;
    ImageBuffer::from_raw(width, height, data.to_vec()).ok_or(MatteError::InvalidBufferSize {
        buffer,
        width,
        height,
        expected: width as usize * height as usize * P::CHANNEL_COUNT as usize,
        actual: data.len(),
    })
}

/// Iterates the in-bounds 4-neighbours of `(x, y)`.
#[inline]
pub fn four_neighbors(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let right = (x + 1 < width).then_some((x + 1, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let down = (y + 1 < height).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn unit_to_u8_rounds_and_clamps() {
        assert_eq!(unit_to_u8(-0.5), 0);
        assert_eq!(unit_to_u8(0.0), 0);
        assert_eq!(unit_to_u8(200.0 / 255.0), 200);
        assert_eq!(unit_to_u8(1.0), 255);
        assert_eq!(unit_to_u8(3.0), 255);
        assert_eq!(unit_to_u8(f32::NAN), 0);
    }

    #[test]
    fn validate_non_empty_image_rejects_zero_sides() {
        assert!(validate_non_empty_image(1, 1).is_ok());
        assert_eq!(
            validate_non_empty_image(0, 5),
            Err(MatteError::DegenerateImage {
                width: 0,
                height: 5
            })
        );
    }

    #[test]
    fn validate_buffer_len_reports_expected_size() {
        assert!(validate_buffer_len(BufferKind::Guide, 16, 2, 2, 4).is_ok());
        assert_eq!(
            validate_buffer_len(BufferKind::Mask, 3, 2, 2, 1),
            Err(MatteError::InvalidBufferSize {
                buffer: BufferKind::Mask,
                width: 2,
                height: 2,
                expected: 4,
                actual: 3,
            })
        );
    }

    #[test]
    fn image_from_slice_builds_rgba_image() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let image: Image<Rgba<u8>> = image_from_slice(BufferKind::Guide, &data, 2, 1).unwrap();
        assert_eq!(image.get_pixel(1, 0), &Rgba([5, 6, 7, 8]));

        let short: MatteResult<Image<Luma<u8>>> = image_from_slice(BufferKind::Mask, &data, 3, 3);
        assert!(short.is_err());
    }

    #[test]
    fn four_neighbors_stays_in_bounds() {
        let corner: Vec<_> = four_neighbors(0, 0, 3, 3).collect();
        assert_eq!(corner, vec![(1, 0), (0, 1)]);
        assert_eq!(four_neighbors(1, 1, 3, 3).count(), 4);
    }
}
