use image::{Luma, Primitive};
use imageproc::definitions::Image;

use crate::error::{BufferKind, MatteResult};
use crate::utils::validate_buffer_len;

/// Summed-area table (integral image)
///
/// Each entry holds the sum of every source value in the rectangle spanning
/// the origin to that coordinate, so any axis-aligned rectangle sum costs four
/// lookups. Sums are accumulated in `f64` so that large float masks keep their
/// precision.
pub struct SummedAreaTable {
    data: Vec<f64>,
    width: u32,
    height: u32,
}

/// Builds a summed-area table from a single-channel image
pub trait CreateSummedAreaTable {
    /// Creates the summed-area table of this image
    fn create_summed_area_table(&self) -> SummedAreaTable;
}

impl<T> CreateSummedAreaTable for Image<Luma<T>>
where
    Luma<T>: image::Pixel<Subpixel = T>,
    T: Primitive + Into<f64>,
{
    fn create_summed_area_table(&self) -> SummedAreaTable {
        let (width, height) = self.dimensions();
        SummedAreaTable::accumulate(self.as_raw(), width, height)
    }
}

impl SummedAreaTable {
    /// Creates a summed-area table from row-major single-channel data
    ///
    /// # Errors
    ///
    /// * `MatteError::DegenerateImage` for a zero dimension
    /// * `MatteError::InvalidBufferSize` if `data.len() != width * height`
    pub fn from_data<T>(data: &[T], width: u32, height: u32) -> MatteResult<Self>
    where
        T: Copy + Into<f64>,
    {
        validate_buffer_len(BufferKind::Values, data.len(), width, height, 1)?;
        Ok(Self::accumulate(data, width, height))
    }

    /// Builds the table from the first `width * height` values of `data`
    fn accumulate<T>(data: &[T], width: u32, height: u32) -> Self
    where
        T: Copy + Into<f64>,
    {
        let w = width as usize;
        let mut table = vec![0.0f64; w * height as usize];
        if table.is_empty() {
            return Self {
                data: table,
                width,
                height,
            };
        }

        for (y, row) in data.chunks_exact(w).take(height as usize).enumerate() {
            // sat(x, y) = row_sum(0..=x, y) + sat(x, y - 1)
            let mut row_sum = 0.0f64;
            for (x, &value) in row.iter().enumerate() {
                let index = y * w + x;
                row_sum += Into::<f64>::into(value);
                table[index] = if y > 0 {
                    row_sum + table[index - w]
                } else {
                    row_sum
                };
            }
        }

        Self {
            data: table,
            width,
            height,
        }
    }

    /// Returns the table value at `(x, y)`, or 0 outside the table
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> f64 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            0.0
        } else {
            self.data[y as usize * self.width as usize + x as usize]
        }
    }

    /// Sum of the values in the inclusive rectangle `(x1, y1)..=(x2, y2)`
    ///
    /// The rectangle is clipped to the table; an empty rectangle sums to 0.
    ///
    /// Sum = sat(x2, y2) - sat(x1-1, y2) - sat(x2, y1-1) + sat(x1-1, y1-1)
    #[must_use]
    pub fn rectangle_sum(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> f64 {
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(i64::from(self.width) - 1);
        let y2 = y2.min(i64::from(self.height) - 1);

        if x1 > x2 || y1 > y2 {
            return 0.0;
        }

        let bottom_right = self.get(x2, y2);
        let top_right = self.get(x2, y1 - 1);
        let bottom_left = self.get(x1 - 1, y2);
        let top_left = self.get(x1 - 1, y1 - 1);

        bottom_right - top_right - bottom_left + top_left
    }

    /// Table width
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Table height
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw table data in row-major order
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}
