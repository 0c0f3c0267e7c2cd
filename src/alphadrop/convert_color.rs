use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::map::map_colors;

use crate::utils::{u8_to_unit, unit_to_u8};

/// Rec. 601 luma weights
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Luminance of an RGB triple, normalised to [0, 1]
#[inline]
#[must_use]
pub fn luminance(rgb: [u8; 3]) -> f32 {
    let [r, g, b] = rgb;
    (LUMA_WEIGHTS[0] * f32::from(r) + LUMA_WEIGHTS[1] * f32::from(g) + LUMA_WEIGHTS[2] * f32::from(b))
        / 255.0
}

/// Luminance plane of an RGBA image, in [0, 1]
#[must_use]
pub fn luminance_image(image: &Image<Rgba<u8>>) -> Image<Luma<f32>> {
    map_colors(image, |Rgba([r, g, b, _])| Luma([luminance([r, g, b])]))
}

/// 8-bit grayscale plane of an RGBA image
#[must_use]
pub fn gray_image(image: &Image<Rgba<u8>>) -> Image<Luma<u8>> {
    map_colors(image, |Rgba([r, g, b, _])| Luma([unit_to_u8(luminance([r, g, b]))]))
}

/// Converts a byte mask to a float mask in [0, 1]
#[must_use]
pub fn to_unit_mask(mask: &Image<Luma<u8>>) -> Image<Luma<f32>> {
    map_colors(mask, |Luma([v])| Luma([u8_to_unit(v)]))
}

/// Converts a float mask to bytes, rounding and clamping to [0, 255]
#[must_use]
pub fn to_byte_mask(mask: &Image<Luma<f32>>) -> Image<Luma<u8>> {
    map_colors(mask, |Luma([v])| Luma([unit_to_u8(v)]))
}

/// Alpha channel of an RGBA image
#[must_use]
pub fn alpha_channel(image: &Image<Rgba<u8>>) -> Image<Luma<u8>> {
    map_colors(image, |Rgba([_, _, _, a])| Luma([a]))
}

/// Hue units in a full turn; one unit is two degrees
pub const HUE_RANGE: f32 = 180.0;
/// Upper bound of the saturation and lightness scales
pub const HSL_CHANNEL_MAX: f32 = 255.0;

/// Colour in hue/saturation/lightness form, on the 8-bit scale
///
/// Hue is in `[0, 180)` (half degrees), saturation and lightness in
/// `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl Hsl {
    /// Converts an 8-bit RGB triple
    #[must_use]
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb.map(u8_to_unit);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (max + min) / 2.0;
        let delta = max - min;

        if delta <= f32::EPSILON {
            return Self {
                hue: 0.0,
                saturation: 0.0,
                lightness: lightness * HSL_CHANNEL_MAX,
            };
        }

        let saturation = if lightness > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };

        let sector = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        Self {
            hue: (sector * HUE_RANGE / 6.0).rem_euclid(HUE_RANGE),
            saturation: saturation * HSL_CHANNEL_MAX,
            lightness: lightness * HSL_CHANNEL_MAX,
        }
    }

    /// Circular hue distance, at most `HUE_RANGE / 2`
    #[must_use]
    pub fn hue_distance(&self, other: &Self) -> f32 {
        let diff = (self.hue - other.hue).abs().rem_euclid(HUE_RANGE);
        diff.min(HUE_RANGE - diff)
    }
}
