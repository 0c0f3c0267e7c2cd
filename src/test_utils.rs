//! Image fixtures shared by the unit tests.

use image::{ImageBuffer, Rgba};
use imageproc::definitions::Image;

/// Opaque guide of a single gray level
pub fn gray_guide(width: u32, height: u32, level: u8) -> Image<Rgba<u8>> {
    ImageBuffer::from_pixel(width, height, Rgba([level, level, level, 255]))
}

/// Opaque guide, black on the left half and white on the right
pub fn split_guide(width: u32, height: u32) -> Image<Rgba<u8>> {
    ImageBuffer::from_fn(width, height, |x, _| {
        let level = if x < width / 2 { 0 } else { 255 };
        Rgba([level, level, level, 255])
    })
}

/// Opaque square of `foreground` inside `[border, size - border)` on a
/// `background` frame
pub fn framed_square(size: u32, border: u32, background: [u8; 3], foreground: [u8; 3]) -> Image<Rgba<u8>> {
    let inner = border..size.saturating_sub(border);
    ImageBuffer::from_fn(size, size, |x, y| {
        let [r, g, b] = if inner.contains(&x) && inner.contains(&y) {
            foreground
        } else {
            background
        };
        Rgba([r, g, b, 255])
    })
}

/// Orange canvas, opaque inside `[from, to)` on both axes and transparent elsewhere
pub fn alpha_square(size: u32, from: u32, to: u32) -> Image<Rgba<u8>> {
    ImageBuffer::from_fn(size, size, |x, y| {
        let inside = (from..to).contains(&x) && (from..to).contains(&y);
        Rgba([230, 120, 20, if inside { 255 } else { 0 }])
    })
}
