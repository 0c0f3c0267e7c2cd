use image::{Luma, Primitive};
use imageproc::definitions::Image;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::alphadrop::summed_area_table::{CreateSummedAreaTable, SummedAreaTable};
use crate::error::MatteResult;

/// Windowed mean backed by a summed-area table
///
/// The window is clamped to the image: edge pixels average over the part of
/// the window that lies inside the image and divide by that smaller area.
/// Cost is independent of the radius. A radius of 0 is the identity.
pub trait BoxFilter {
    /// Output type of the filter
    type Output;

    /// Mean over a `(2 * x_radius + 1) x (2 * y_radius + 1)` window
    fn box_filter(&self, x_radius: u32, y_radius: u32) -> Self::Output;

    /// Mean over a square `(2 * radius + 1)²` window
    fn box_filter_square(&self, radius: u32) -> Self::Output {
        self.box_filter(radius, radius)
    }
}

impl<T> BoxFilter for Image<Luma<T>>
where
    Luma<T>: image::Pixel<Subpixel = T>,
    T: Primitive + Into<f64> + Into<f32>,
{
    type Output = Image<Luma<f32>>;

    fn box_filter(&self, x_radius: u32, y_radius: u32) -> Self::Output {
        let (width, height) = self.dimensions();
        if x_radius == 0 && y_radius == 0 {
            let values: Vec<f32> = self.as_raw().iter().map(|&v| Into::<f32>::into(v)).collect();
            return Image::from_raw(width, height, values)
                .unwrap_or_else(|| Image::new(width, height));
        }

        let sat = self.create_summed_area_table();
        apply_sat_box_filter(&sat, x_radius, y_radius)
    }
}

/// Box filter over a raw row-major float buffer
///
/// `radius <= 0` returns the input unchanged.
///
/// # Errors
///
/// * `MatteError::DegenerateImage` for a zero dimension
/// * `MatteError::InvalidBufferSize` if `values.len() != width * height`
pub fn box_filter(values: &[f32], width: u32, height: u32, radius: i32) -> MatteResult<Vec<f32>> {
    let sat = SummedAreaTable::from_data(values, width, height)?;
    if radius <= 0 {
        return Ok(values.to_vec());
    }
    Ok(apply_sat_box_filter(&sat, radius.unsigned_abs(), radius.unsigned_abs()).into_raw())
}

fn apply_sat_box_filter(sat: &SummedAreaTable, x_radius: u32, y_radius: u32) -> Image<Luma<f32>> {
    let (width, height) = (sat.width(), sat.height());
    let mut output: Image<Luma<f32>> = Image::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let fill_row = |(y, row): (usize, &mut [f32])| {
        let y = y as i64;
        let y1 = y - i64::from(y_radius);
        let y2 = (y + i64::from(y_radius)).min(i64::from(height) - 1);
        let clipped_y1 = y1.max(0);

        for (x, value) in row.iter_mut().enumerate() {
            let x = x as i64;
            let x1 = x - i64::from(x_radius);
            let x2 = (x + i64::from(x_radius)).min(i64::from(width) - 1);
            let clipped_x1 = x1.max(0);

            let sum = sat.rectangle_sum(x1, y1, x2, y2);

            // Border windows are smaller; divide by the area actually covered
            let area = ((x2 - clipped_x1 + 1) * (y2 - clipped_y1 + 1)) as f64;
            *value = (sum / area) as f32;
        }
    };

    #[cfg(feature = "rayon")]
    output
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(fill_row);

    #[cfg(not(feature = "rayon"))]
    output
        .chunks_mut(width as usize)
        .enumerate()
        .for_each(fill_row);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BufferKind, MatteError};
    use image::ImageBuffer;

    #[test]
    fn box_filter_on_uniform_image_is_uniform() {
        let image = ImageBuffer::from_fn(7, 7, |_, _| Luma([2.0f32]));
        let filtered = image.box_filter_square(2);

        for pixel in filtered.pixels() {
            assert!((pixel[0] - 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn box_filter_averages_centre_window() {
        let mut image = ImageBuffer::from_fn(5, 5, |_, _| Luma([1.0f32]));
        image.put_pixel(2, 2, Luma([5.0f32]));

        let filtered = image.box_filter_square(1);

        // (8 * 1.0 + 5.0) / 9
        let expected = 13.0 / 9.0;
        assert!((filtered.get_pixel(2, 2)[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn box_filter_divides_by_clamped_area_at_corners() {
        let image: Image<Luma<u8>> =
            ImageBuffer::from_raw(3, 3, vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        let filtered = image.box_filter_square(1);

        // Corner window covers (0,0)..=(1,1): (1 + 2 + 4 + 5) / 4
        assert!((filtered.get_pixel(0, 0)[0] - 3.0).abs() < 1e-6);
        // Edge window covers 6 pixels: (1 + 2 + 3 + 4 + 5 + 6) / 6
        assert!((filtered.get_pixel(1, 0)[0] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn box_filter_with_radius_larger_than_image_is_global_mean() {
        let image: Image<Luma<f32>> =
            ImageBuffer::from_raw(2, 2, vec![0.0f32, 1.0, 2.0, 3.0]).unwrap();
        let filtered = image.box_filter_square(10);
        assert!(filtered.pixels().all(|p| (p[0] - 1.5).abs() < 1e-6));
    }

    #[test]
    fn box_filter_with_zero_radius_is_identity() {
        let image: Image<Luma<u8>> = ImageBuffer::from_raw(2, 2, vec![3u8, 7, 11, 250]).unwrap();
        let filtered = image.box_filter_square(0);
        assert_eq!(filtered.into_raw(), vec![3.0f32, 7.0, 11.0, 250.0]);
    }

    #[test]
    fn raw_box_filter_matches_image_filter() {
        let values = [0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0];
        let image: Image<Luma<f32>> = ImageBuffer::from_raw(3, 2, values.to_vec()).unwrap();
        assert_eq!(box_filter(&values, 3, 2, 1).unwrap(), image.box_filter_square(1).into_raw());
        assert_eq!(box_filter(&values, 3, 2, 0).unwrap(), values.to_vec());
        assert_eq!(box_filter(&values, 3, 2, -3).unwrap(), values.to_vec());
    }

    #[test]
    fn raw_box_filter_rejects_mismatched_length() {
        assert_eq!(
            box_filter(&[0.0; 5], 3, 2, 1),
            Err(MatteError::InvalidBufferSize {
                buffer: BufferKind::Values,
                width: 3,
                height: 2,
                expected: 6,
                actual: 5,
            })
        );
        assert_eq!(
            box_filter(&[], 0, 2, 0),
            Err(MatteError::DegenerateImage { width: 0, height: 2 })
        );
    }

    #[test]
    fn box_filter_supports_anisotropic_windows() {
        let image: Image<Luma<u8>> =
            ImageBuffer::from_raw(3, 3, vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        let filtered = image.box_filter(1, 0);
        // Row-only window at the centre: (4 + 5 + 6) / 3
        assert!((filtered.get_pixel(1, 1)[0] - 5.0).abs() < 1e-6);
    }
}
