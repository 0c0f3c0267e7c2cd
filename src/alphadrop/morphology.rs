//! Grayscale erosion and dilation over single-channel buffers.
//!
//! Binary masks are stored as 0/255, so the grayscale minimum and maximum
//! double as logical AND and OR. The structuring element is a square of side
//! `2 * radius + 1`, evaluated separably (rows, then columns).

use image::Luma;
use imageproc::definitions::Image;

/// How samples falling outside the image are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderPolicy {
    /// Out-of-bounds samples are skipped; the window shrinks at the border
    Clamp,
    /// Out-of-bounds samples take this value
    ///
    /// Use `Constant(0)` when eroding foreground so shapes shrink away from
    /// the frame, and `Constant(255)` when eroding background so it does not
    /// bleed in from outside the image.
    Constant(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    #[inline]
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }

    const fn identity(self) -> u8 {
        match self {
            Self::Min => u8::MAX,
            Self::Max => u8::MIN,
        }
    }
}

/// Square-kernel morphology operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Morphology {
    radius: u32,
    border: BorderPolicy,
}

impl Morphology {
    /// Creates an operator with the given structuring radius and border policy
    #[must_use]
    pub const fn new(radius: u32, border: BorderPolicy) -> Self {
        Self { radius, border }
    }

    /// 3x3 operator with clamped borders, used for grow/shrink and cleanup
    #[must_use]
    pub const fn unit() -> Self {
        Self::new(1, BorderPolicy::Clamp)
    }

    /// Structuring radius
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Border policy
    #[must_use]
    pub const fn border(&self) -> BorderPolicy {
        self.border
    }

    /// Erodes `iterations` times, one radius-sized pass at a time
    #[must_use]
    pub fn erode(&self, image: &Image<Luma<u8>>, iterations: u32) -> Image<Luma<u8>> {
        self.repeat(image, iterations, Extremum::Min)
    }

    /// Dilates `iterations` times, one radius-sized pass at a time
    #[must_use]
    pub fn dilate(&self, image: &Image<Luma<u8>>, iterations: u32) -> Image<Luma<u8>> {
        self.repeat(image, iterations, Extremum::Max)
    }

    /// Erosion followed by dilation; removes specks smaller than the kernel
    #[must_use]
    pub fn open(&self, image: &Image<Luma<u8>>, iterations: u32) -> Image<Luma<u8>> {
        let eroded = self.erode(image, iterations);
        self.dilate(&eroded, iterations)
    }

    /// Dilation followed by erosion; fills holes smaller than the kernel
    #[must_use]
    pub fn close(&self, image: &Image<Luma<u8>>, iterations: u32) -> Image<Luma<u8>> {
        let dilated = self.dilate(image, iterations);
        self.erode(&dilated, iterations)
    }

    fn repeat(&self, image: &Image<Luma<u8>>, iterations: u32, op: Extremum) -> Image<Luma<u8>> {
        let mut current = image.clone();
        if self.radius == 0 {
            return current;
        }
        for _ in 0..iterations {
            current = self.single_pass(&current, op);
        }
        current
    }

    fn single_pass(&self, image: &Image<Luma<u8>>, op: Extremum) -> Image<Luma<u8>> {
        let (width, height) = image.dimensions();
        let horizontal = Image::from_fn(width, height, |x, y| {
            self.window_extremum(x, width, op, |sx| image.get_pixel(sx, y)[0])
        });
        Image::from_fn(width, height, |x, y| {
            self.window_extremum(y, height, op, |sy| horizontal.get_pixel(x, sy)[0])
        })
    }

    /// Extremum of the 1-D window centred at `center` along an axis of `len`
    #[inline]
    fn window_extremum<F>(&self, center: u32, len: u32, op: Extremum, sample: F) -> Luma<u8>
    where
        F: Fn(u32) -> u8,
    {
        let start = i64::from(center) - i64::from(self.radius);
        let end = i64::from(center) + i64::from(self.radius);

        let mut value = (start.max(0)..=end.min(i64::from(len) - 1))
            .map(|s| sample(s as u32))
            .fold(op.identity(), |acc, v| op.pick(acc, v));

        if let BorderPolicy::Constant(border) = self.border {
            if start < 0 || end >= i64::from(len) {
                value = op.pick(value, border);
            }
        }

        Luma([value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn square_mask(size: u32, from: u32, to: u32) -> Image<Luma<u8>> {
        ImageBuffer::from_fn(size, size, |x, y| {
            let inside = (from..to).contains(&x) && (from..to).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    fn count_foreground(mask: &Image<Luma<u8>>) -> usize {
        mask.pixels().filter(|p| p[0] == 255).count()
    }

    #[test]
    fn erode_shrinks_square_by_radius() {
        let mask = square_mask(12, 2, 10);
        let eroded = Morphology::unit().erode(&mask, 1);
        assert_eq!(count_foreground(&eroded), 6 * 6);
    }

    #[test]
    fn dilate_grows_square_by_radius() {
        let mask = square_mask(12, 4, 8);
        let dilated = Morphology::new(2, BorderPolicy::Clamp).dilate(&mask, 1);
        assert_eq!(count_foreground(&dilated), 8 * 8);
    }

    #[test]
    fn iterations_compose_as_sequential_passes() {
        let mask = square_mask(16, 2, 14);
        let stepwise = Morphology::unit().erode(&mask, 3);
        let single = Morphology::new(3, BorderPolicy::Clamp).erode(&mask, 1);
        assert_eq!(stepwise, single);
        assert_eq!(count_foreground(&stepwise), 6 * 6);
    }

    #[test]
    fn constant_border_zero_erodes_from_frame() {
        let full = ImageBuffer::from_pixel(5, 5, Luma([255u8]));

        let clamped = Morphology::new(1, BorderPolicy::Clamp).erode(&full, 1);
        assert_eq!(count_foreground(&clamped), 25);

        let framed = Morphology::new(1, BorderPolicy::Constant(0)).erode(&full, 1);
        assert_eq!(count_foreground(&framed), 9);
    }

    #[test]
    fn constant_border_full_keeps_background_at_frame() {
        let background = ImageBuffer::from_pixel(5, 5, Luma([255u8]));
        let eroded = Morphology::new(2, BorderPolicy::Constant(255)).erode(&background, 1);
        assert_eq!(count_foreground(&eroded), 25);
    }

    #[test]
    fn open_removes_isolated_speck() {
        let mut mask = square_mask(12, 3, 9);
        mask.put_pixel(0, 11, Luma([255]));
        let opened = Morphology::unit().open(&mask, 1);
        assert_eq!(opened.get_pixel(0, 11)[0], 0);
        assert_eq!(count_foreground(&opened), 36);
    }

    #[test]
    fn close_fills_single_pixel_hole() {
        let mut mask = square_mask(12, 2, 10);
        mask.put_pixel(5, 5, Luma([0]));
        let closed = Morphology::unit().close(&mask, 1);
        assert_eq!(closed.get_pixel(5, 5)[0], 255);
        assert_eq!(count_foreground(&closed), 64);
    }

    #[test]
    fn grayscale_erode_takes_window_minimum() {
        let image: Image<Luma<u8>> =
            ImageBuffer::from_raw(3, 3, vec![9u8, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        let eroded = Morphology::unit().erode(&image, 1);
        assert_eq!(eroded.get_pixel(1, 1)[0], 1);
        assert_eq!(eroded.get_pixel(0, 0)[0], 5);
    }

    #[test]
    fn zero_radius_is_identity() {
        let mask = square_mask(6, 1, 4);
        assert_eq!(Morphology::new(0, BorderPolicy::Constant(0)).erode(&mask, 4), mask);
    }
}
