//! Interactive alpha adjustments recomputed from an immutable baseline.
//!
//! Operators always start from the snapshot captured when processing
//! finished, never from the previously displayed result. Resetting every
//! parameter to zero therefore restores the baseline exactly, and a result
//! computed for superseded parameters can simply be dropped.

use std::sync::Arc;

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::filter::median_filter;
use imageproc::map::map_colors2;
use log::debug;

use crate::alphadrop::alpha::ReplaceAlpha;
use crate::alphadrop::box_filter::BoxFilter;
use crate::alphadrop::convert_color::alpha_channel;
use crate::alphadrop::morphology::{BorderPolicy, Morphology};
use crate::error::MatteResult;
use crate::utils::{four_neighbors, validate_non_empty_image};

/// A 4-neighbour alpha jump above this marks a feather edge
pub const FEATHER_EDGE_JUMP: u8 = 10;
/// Smoothing only touches alpha strictly above this
pub const SMOOTH_LOW_ALPHA: u8 = 5;
/// Smoothing only touches alpha strictly below this
pub const SMOOTH_HIGH_ALPHA: u8 = 250;
/// Smoothing strength at which the median fully replaces the original
pub const SMOOTH_FULL_STRENGTH: u32 = 10;

/// Slider values of the refinement operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RefinementParams {
    /// Positive grows the foreground, negative shrinks it
    pub grow: i32,
    /// Feather radius in pixels
    pub feather: u32,
    /// Smoothing strength
    pub smooth: u32,
}

impl RefinementParams {
    /// Parameters that leave the baseline untouched
    pub const IDENTITY: Self = Self {
        grow: 0,
        feather: 0,
        smooth: 0,
    };

    #[must_use]
    pub const fn new(grow: i32, feather: u32, smooth: u32) -> Self {
        Self {
            grow,
            feather,
            smooth,
        }
    }

    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.grow == 0 && self.feather == 0 && self.smooth == 0
    }
}

/// Repeated 3x3 dilation (`amount > 0`) or erosion (`amount < 0`)
#[must_use]
pub fn grow_shrink(alpha: &Image<Luma<u8>>, amount: i32) -> Image<Luma<u8>> {
    let unit = Morphology::unit();
    let iterations = amount.unsigned_abs();
    match amount.signum() {
        1 => unit.dilate(alpha, iterations),
        -1 => unit.erode(alpha, iterations),
        _ => alpha.clone(),
    }
}

/// Whether an alpha pixel sits on a transition
fn is_alpha_edge(alpha: &Image<Luma<u8>>, x: u32, y: u32) -> bool {
    let value = alpha.get_pixel(x, y)[0];
    if value != 0 && value != u8::MAX {
        return true;
    }
    four_neighbors(x, y, alpha.width(), alpha.height())
        .any(|(nx, ny)| alpha.get_pixel(nx, ny)[0].abs_diff(value) > FEATHER_EDGE_JUMP)
}

/// Box-blurs alpha within `radius` of an edge pixel
///
/// Pixels farther than `radius` from every edge pass through unchanged.
#[must_use]
pub fn feather_edges(alpha: &Image<Luma<u8>>, radius: u32) -> Image<Luma<u8>> {
    if radius == 0 {
        return alpha.clone();
    }

    let (width, height) = alpha.dimensions();
    let edges = Image::from_fn(width, height, |x, y| {
        Luma([if is_alpha_edge(alpha, x, y) { u8::MAX } else { 0 }])
    });
    let region = Morphology::new(radius, BorderPolicy::Clamp).dilate(&edges, 1);
    let blurred = alpha.box_filter_square(radius);

    Image::from_fn(width, height, |x, y| {
        if region.get_pixel(x, y)[0] == u8::MAX {
            Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
        } else {
            *alpha.get_pixel(x, y)
        }
    })
}

/// Blends semi-transparent alpha towards its local median
///
/// The median window has radius `ceil(strength / 2)`; the blend fraction is
/// `strength / 10`, saturating at 1.
#[must_use]
pub fn smooth_alpha(alpha: &Image<Luma<u8>>, strength: u32) -> Image<Luma<u8>> {
    if strength == 0 {
        return alpha.clone();
    }

    let radius = strength.div_ceil(2);
    let blend = (strength as f32 / SMOOTH_FULL_STRENGTH as f32).min(1.0);
    let median = median_filter(alpha, radius, radius);

    map_colors2(alpha, &median, |Luma([value]), Luma([med])| {
        if value > SMOOTH_LOW_ALPHA && value < SMOOTH_HIGH_ALPHA {
            let mixed = f32::from(value) + (f32::from(med) - f32::from(value)) * blend;
            Luma([mixed.round().clamp(0.0, 255.0) as u8])
        } else {
            Luma([value])
        }
    })
}

/// Applies grow/shrink, then feather, then smooth
#[must_use]
pub fn refine_alpha(alpha: &Image<Luma<u8>>, params: &RefinementParams) -> Image<Luma<u8>> {
    let grown = grow_shrink(alpha, params.grow);
    let feathered = feather_edges(&grown, params.feather);
    smooth_alpha(&feathered, params.smooth)
}

/// Immutable copy of a finished result
///
/// Cloning is cheap; the pixels are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSnapshot {
    image: Arc<Image<Rgba<u8>>>,
    alpha: Arc<Image<Luma<u8>>>,
}

impl BaselineSnapshot {
    /// Captures `image` as a baseline
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DegenerateImage` for an image with a zero side.
    pub fn new(image: Image<Rgba<u8>>) -> MatteResult<Self> {
        validate_non_empty_image(image.width(), image.height())?;
        let alpha = alpha_channel(&image);
        Ok(Self {
            image: Arc::new(image),
            alpha: Arc::new(alpha),
        })
    }

    #[must_use]
    pub fn image(&self) -> &Image<Rgba<u8>> {
        &self.image
    }

    #[must_use]
    pub fn alpha(&self) -> &Image<Luma<u8>> {
        &self.alpha
    }

    /// Baseline colours with the alpha recomputed for `params`
    #[must_use]
    pub fn derive(&self, params: &RefinementParams) -> Image<Rgba<u8>> {
        if params.is_identity() {
            return self.image.as_ref().clone();
        }
        let alpha = refine_alpha(&self.alpha, params);
        let mut image = self.image.as_ref().clone();
        // Same dimensions by construction
        if image.replace_alpha_mut(&alpha).is_err() {
            return self.image.as_ref().clone();
        }
        image
    }
}

/// Pending recomputation, safe to run on another thread
#[derive(Debug, Clone)]
pub struct RefinementJob {
    baseline: BaselineSnapshot,
    params: RefinementParams,
    generation: u64,
    request_id: u64,
}

impl RefinementJob {
    #[must_use]
    pub const fn params(&self) -> &RefinementParams {
        &self.params
    }

    /// Computes the result; the baseline is never touched
    #[must_use]
    pub fn run(self) -> RefinementOutput {
        RefinementOutput {
            image: self.baseline.derive(&self.params),
            params: self.params,
            generation: self.generation,
            request_id: self.request_id,
        }
    }
}

/// Result of a [`RefinementJob`], tagged with the request it answers
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutput {
    pub image: Image<Rgba<u8>>,
    pub params: RefinementParams,
    generation: u64,
    request_id: u64,
}

/// Baseline lifecycle for live slider adjustments
///
/// Only the most recent request against the current baseline is accepted;
/// results for superseded parameters or an invalidated baseline are dropped.
#[derive(Debug, Clone, Default)]
pub struct RefinementSession {
    baseline: Option<BaselineSnapshot>,
    generation: u64,
    latest_request: u64,
}

impl RefinementSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly processed result as the new baseline
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DegenerateImage` for an image with a zero side;
    /// the session is left without a baseline in that case.
    pub fn capture(&mut self, image: Image<Rgba<u8>>) -> MatteResult<()> {
        self.invalidate();
        self.baseline = Some(BaselineSnapshot::new(image)?);
        Ok(())
    }

    /// Drops the baseline, e.g. when a new image is loaded
    pub fn invalidate(&mut self) {
        self.baseline = None;
        self.generation += 1;
        self.latest_request = 0;
    }

    #[must_use]
    pub const fn baseline(&self) -> Option<&BaselineSnapshot> {
        self.baseline.as_ref()
    }

    /// Registers new parameters and returns the job computing them
    ///
    /// Returns `None` without a baseline.
    pub fn request(&mut self, params: RefinementParams) -> Option<RefinementJob> {
        let baseline = self.baseline.clone()?;
        self.latest_request += 1;
        Some(RefinementJob {
            baseline,
            params,
            generation: self.generation,
            request_id: self.latest_request,
        })
    }

    /// Returns the image if `output` answers the latest live request
    pub fn accept(&self, output: RefinementOutput) -> Option<Image<Rgba<u8>>> {
        let current = self.baseline.is_some()
            && output.generation == self.generation
            && output.request_id == self.latest_request;
        if current {
            Some(output.image)
        } else {
            debug!(
                "Discarding stale refinement result {:?} (request {} of generation {})",
                output.params, output.request_id, output.generation
            );
            None
        }
    }

    /// Requests, computes and accepts in one call
    pub fn apply(&mut self, params: RefinementParams) -> Option<Image<Rgba<u8>>> {
        let output = self.request(params)?.run();
        self.accept(output)
    }
}
