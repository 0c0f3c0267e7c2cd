//! Background removal without a model.
//!
//! The dominant colour of a band around the image border is taken as the
//! background. Pixels close to it in HSL space are cut, the binary mask is
//! cleaned morphologically, and transitions are softened with a
//! luminance-aware average.

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::map::map_colors;
use itertools::Itertools;
use log::{debug, info};

use crate::alphadrop::alpha::ReplaceAlpha;
use crate::alphadrop::convert_color::{luminance, Hsl};
use crate::alphadrop::morphology::Morphology;
use crate::alphadrop::trimap::color_distance;
use crate::error::{MatteError, MatteResult};
use crate::utils::{validate_non_empty_image, DIVISION_EPSILON};

/// Default HSL tolerance on the 8-bit scale; saturation and lightness allow
/// twice this
pub const DEFAULT_COLOR_TOLERANCE: f32 = 30.0;
/// Border band width as a fraction of the shorter side
pub const BORDER_FRACTION: f32 = 0.05;
/// Minimum border band width in pixels
pub const MIN_BORDER_WIDTH: u32 = 5;
/// Border samples are snapped to the nearest multiple of this per channel
pub const QUANTIZATION_STEP: u8 = 16;
/// Backgrounds below this saturation are matched on lightness
pub const GRAY_SATURATION: f32 = 15.0;
/// Lightness tolerance factor for gray backgrounds
pub const GRAY_LIGHTNESS_FACTOR: f32 = 1.5;
/// Window radius of the edge smoothing pass
pub const EDGE_SMOOTH_RADIUS: u32 = 2;
/// Luminance sigma of the edge smoothing weights
pub const EDGE_SMOOTH_SIGMA: f32 = 0.1;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Border-colour heuristic segmenter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSegmenter {
    tolerance: f32,
    erode_iterations: u32,
    smooth_radius: u32,
    smooth_sigma: f32,
}

impl Default for ColorSegmenter {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_COLOR_TOLERANCE,
            erode_iterations: 1,
            smooth_radius: EDGE_SMOOTH_RADIUS,
            smooth_sigma: EDGE_SMOOTH_SIGMA,
        }
    }
}

impl ColorSegmenter {
    /// Creates a segmenter with the given HSL tolerance
    ///
    /// # Errors
    ///
    /// Returns `MatteError::InvalidParameter` if `tolerance` is not a
    /// positive finite number.
    pub fn new(tolerance: f32) -> MatteResult<Self> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(MatteError::InvalidParameter(format!(
                "color tolerance must be positive, got {tolerance}"
            )));
        }
        Ok(Self {
            tolerance,
            ..Self::default()
        })
    }

    /// Sets the number of halo-stripping erosion passes
    #[must_use]
    pub const fn with_erode_iterations(mut self, iterations: u32) -> Self {
        self.erode_iterations = iterations;
        self
    }

    #[must_use]
    pub const fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Width of the sampled border band for an image of the given size
    #[must_use]
    pub fn border_width(width: u32, height: u32) -> u32 {
        let scaled = (width.min(height) as f32 * BORDER_FRACTION) as u32;
        scaled.max(MIN_BORDER_WIDTH)
    }

    /// Most frequent quantised colour in the border band
    ///
    /// Ties go to the smallest colour so the result is deterministic.
    #[must_use]
    pub fn detect_background(&self, image: &Image<Rgba<u8>>) -> [u8; 3] {
        let (width, height) = image.dimensions();
        let band = Self::border_width(width, height);

        image
            .enumerate_pixels()
            .filter(|&(x, y, _)| {
                x < band || y < band || x >= width.saturating_sub(band) || y >= height.saturating_sub(band)
            })
            .map(|(_, _, Rgba([r, g, b, _]))| [*r, *g, *b].map(quantize))
            .counts()
            .into_iter()
            .max_by(|(a_color, a_count), (b_color, b_count)| {
                a_count.cmp(b_count).then_with(|| b_color.cmp(a_color))
            })
            .map_or([255, 255, 255], |(color, _)| color)
    }

    /// Whether a pixel colour matches the background colour
    #[must_use]
    pub fn is_background(&self, pixel: &Hsl, background: &Hsl) -> bool {
        let saturation = (pixel.saturation - background.saturation).abs();
        let lightness = (pixel.lightness - background.lightness).abs();

        if background.saturation < GRAY_SATURATION {
            lightness < GRAY_LIGHTNESS_FACTOR * self.tolerance && saturation < 2.0 * self.tolerance
        } else {
            pixel.hue_distance(background) < self.tolerance
                && saturation < 2.0 * self.tolerance
                && lightness < 2.0 * self.tolerance
        }
    }

    /// Binary mask: background 0, foreground 255
    #[must_use]
    pub fn classify(&self, image: &Image<Rgba<u8>>, background: [u8; 3]) -> Image<Luma<u8>> {
        let background = Hsl::from_rgb(background);
        map_colors(image, |Rgba([r, g, b, _])| {
            let pixel = Hsl::from_rgb([r, g, b]);
            Luma([if self.is_background(&pixel, &background) {
                BACKGROUND
            } else {
                FOREGROUND
            }])
        })
    }

    /// Opening, closing, then halo-stripping erosion
    ///
    /// A pixel removed by the final erosion survives when its colour is
    /// closer to the neighbouring foreground than to the background, so
    /// solid shapes keep their outline while background-coloured fringes go.
    #[must_use]
    pub fn cleanup(
        &self,
        mask: &Image<Luma<u8>>,
        image: &Image<Rgba<u8>>,
        background: [u8; 3],
    ) -> Image<Luma<u8>> {
        let unit = Morphology::unit();
        let mut mask = unit.close(&unit.open(mask, 1), 1);

        for _ in 0..self.erode_iterations {
            let eroded = unit.erode(&mask, 1);
            mask = Image::from_fn(mask.width(), mask.height(), |x, y| {
                let before = mask.get_pixel(x, y)[0];
                let after = eroded.get_pixel(x, y)[0];
                if before == after {
                    return Luma([after]);
                }
                let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
                let keep = surviving_mean(&eroded, image, x, y).is_some_and(|mean| {
                    color_distance([r, g, b], mean) < color_distance([r, g, b], background)
                });
                Luma([if keep { before } else { after }])
            });
        }
        mask
    }

    /// Luminance-weighted average over mask transitions
    ///
    /// Pixels whose 8-neighbourhood is uniform pass through unchanged.
    #[must_use]
    pub fn smooth_edges(&self, mask: &Image<Luma<u8>>, image: &Image<Rgba<u8>>) -> Image<Luma<u8>> {
        let (width, height) = mask.dimensions();
        let radius = i64::from(self.smooth_radius);
        let two_sigma_sq = 2.0 * self.smooth_sigma * self.smooth_sigma + DIVISION_EPSILON;

        Image::from_fn(width, height, |x, y| {
            let value = mask.get_pixel(x, y)[0];
            if !has_differing_neighbor(mask, x, y) {
                return Luma([value]);
            }

            let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
            let center = luminance([r, g, b]);

            let mut weighted = 0.0f32;
            let mut total = 0.0f32;
            for (nx, ny) in window(x, y, radius, width, height) {
                let Rgba([nr, ng, nb, _]) = *image.get_pixel(nx, ny);
                let diff = luminance([nr, ng, nb]) - center;
                let weight = (-(diff * diff) / two_sigma_sq).exp();
                weighted += weight * f32::from(mask.get_pixel(nx, ny)[0]);
                total += weight;
            }

            if total > DIVISION_EPSILON {
                Luma([(weighted / total).round().clamp(0.0, 255.0) as u8])
            } else {
                Luma([value])
            }
        })
    }

    /// Full heuristic mask for `image`
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DegenerateImage` for an image with a zero side.
    pub fn segment(&self, image: &Image<Rgba<u8>>) -> MatteResult<Image<Luma<u8>>> {
        validate_non_empty_image(image.width(), image.height())?;
        info!(
            "Segmenting {}x{} image by border colour",
            image.width(),
            image.height()
        );

        let background = self.detect_background(image);
        debug!("Background colour estimate {background:?}");

        let mask = self.classify(image, background);
        let mask = self.cleanup(&mask, image, background);
        Ok(self.smooth_edges(&mask, image))
    }

    /// Segments `image` and writes the mask into its alpha channel
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DegenerateImage` for an image with a zero side.
    pub fn remove_background(&self, image: &Image<Rgba<u8>>) -> MatteResult<Image<Rgba<u8>>> {
        let mask = self.segment(image)?;
        image.with_alpha(&mask)
    }
}

/// Snaps a channel to the nearest multiple of the quantisation step
#[inline]
fn quantize(channel: u8) -> u8 {
    let step = f32::from(QUANTIZATION_STEP);
    ((f32::from(channel) / step).round() * step).min(255.0) as u8
}

fn window(
    x: u32,
    y: u32,
    radius: i64,
    width: u32,
    height: u32,
) -> impl Iterator<Item = (u32, u32)> {
    let ys = (i64::from(y) - radius).max(0)..=(i64::from(y) + radius).min(i64::from(height) - 1);
    let xs = (i64::from(x) - radius).max(0)..=(i64::from(x) + radius).min(i64::from(width) - 1);
    ys.cartesian_product(xs).map(|(ny, nx)| (nx as u32, ny as u32))
}

fn has_differing_neighbor(mask: &Image<Luma<u8>>, x: u32, y: u32) -> bool {
    let value = mask.get_pixel(x, y)[0];
    window(x, y, 1, mask.width(), mask.height()).any(|(nx, ny)| mask.get_pixel(nx, ny)[0] != value)
}

/// Mean colour of the 3x3 neighbours still foreground after erosion
fn surviving_mean(eroded: &Image<Luma<u8>>, image: &Image<Rgba<u8>>, x: u32, y: u32) -> Option<[u8; 3]> {
    let (sum, count) = window(x, y, 1, eroded.width(), eroded.height())
        .filter(|&(nx, ny)| eroded.get_pixel(nx, ny)[0] == FOREGROUND)
        .fold(([0u32; 3], 0u32), |(mut sum, count), (nx, ny)| {
            let pixel = image.get_pixel(nx, ny);
            for (acc, &channel) in sum.iter_mut().zip(&pixel.0[..3]) {
                *acc += u32::from(channel);
            }
            (sum, count + 1)
        });

    (count > 0).then(|| sum.map(|s| ((s + count / 2) / count) as u8))
}
