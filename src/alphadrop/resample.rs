use image::Luma;
use imageproc::definitions::Image;

/// One axis of a bilinear sampling table
#[derive(Debug, Clone, Copy)]
struct AxisSample {
    /// Lower source index
    lower: u32,
    /// Upper source index, equal to `lower` at the last sample
    upper: u32,
    /// Weight of the upper sample
    fraction: f32,
}

/// Precomputes source indices and weights for one axis.
///
/// Pixel centres are aligned: destination pixel `d` samples source position
/// `(d + 0.5) * src / dst - 0.5`, clamped to the valid range.
fn axis_samples(src_size: u32, dst_size: u32) -> Vec<AxisSample> {
    let scale = src_size as f32 / dst_size as f32;
    let last = src_size.saturating_sub(1);

    (0..dst_size)
        .map(|d| {
            let position = ((d as f32 + 0.5) * scale - 0.5).clamp(0.0, last as f32);
            let lower = (position.floor() as u32).min(last);
            let upper = (lower + 1).min(last);
            AxisSample {
                lower,
                upper,
                fraction: (position - lower as f32).clamp(0.0, 1.0),
            }
        })
        .collect()
}

/// Resizes a float mask with true bilinear (4-sample) interpolation
///
/// Resizing to the current size returns a copy. A zero-sized source or
/// target yields an empty image of the target size.
#[must_use]
pub fn resize_bilinear(image: &Image<Luma<f32>>, new_width: u32, new_height: u32) -> Image<Luma<f32>> {
    let (width, height) = image.dimensions();
    if (width, height) == (new_width, new_height) {
        return image.clone();
    }
    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return Image::new(new_width, new_height);
    }

    let columns = axis_samples(width, new_width);
    let rows = axis_samples(height, new_height);

    Image::from_fn(new_width, new_height, |x, y| {
        let column = columns[x as usize];
        let row = rows[y as usize];

        let top_left = image.get_pixel(column.lower, row.lower)[0];
        let top_right = image.get_pixel(column.upper, row.lower)[0];
        let bottom_left = image.get_pixel(column.lower, row.upper)[0];
        let bottom_right = image.get_pixel(column.upper, row.upper)[0];

        let top = top_left + (top_right - top_left) * column.fraction;
        let bottom = bottom_left + (bottom_right - bottom_left) * column.fraction;
        Luma([top + (bottom - top) * row.fraction])
    })
}
