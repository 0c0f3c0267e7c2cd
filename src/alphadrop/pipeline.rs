//! Raw model mask to final RGBA, as an explicit ordered list of stages.
//!
//! Every stage reads the intermediates left by earlier stages from a
//! [`StageState`] and writes fresh buffers back; nothing is aliased in place.
//! Stages can therefore be run and inspected one at a time.

use std::fmt;
use std::str::FromStr;

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use imageproc::map::map_colors;
use log::{debug, info, warn};

use crate::alphadrop::alpha::ReplaceAlpha;
use crate::alphadrop::convert_color::{luminance_image, to_byte_mask, to_unit_mask};
use crate::alphadrop::defringe::Defringe;
use crate::alphadrop::feather::{sobel_magnitude, uncertainty_map, GradientFeather};
use crate::alphadrop::guided_filter::GuidedMaskFilter;
use crate::alphadrop::resample::resize_bilinear;
use crate::alphadrop::trimap::{refine_with_color_samples, TrimapParams};
use crate::error::{MatteError, MatteResult};
use crate::utils::{validate_non_empty_image, DIVISION_EPSILON};

/// Lower clip of the edge-hardening curve
pub const HARDEN_LOW: f32 = 0.15;
/// Upper clip of the edge-hardening curve
pub const HARDEN_HIGH: f32 = 0.85;

/// Refinement flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefineMode {
    /// Soft, hair-friendly edges
    #[default]
    Soft,
    /// Crisp edges for solid objects
    Hard,
}

impl RefineMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for RefineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefineMode {
    type Err = MatteError;

    /// Accepts "soft"/"hard" and the method names "matting"/"segmentation"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" | "matting" => Ok(Self::Soft),
            "hard" | "segmentation" => Ok(Self::Hard),
            other => Err(MatteError::InvalidParameter(format!(
                "unknown refine mode {other:?}, expected \"soft\" or \"hard\""
            ))),
        }
    }
}

/// Numeric parameters of one refinement mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModePreset {
    pub guided_radius: u32,
    pub guided_epsilon: f32,
    pub fg_threshold: f32,
    pub bg_threshold: f32,
    pub erode_size: u32,
    pub feather_radius: u32,
    pub harden_edges: bool,
}

impl ModePreset {
    /// Large window, fine detail, generous feathering
    pub const SOFT: Self = Self {
        guided_radius: 8,
        guided_epsilon: 1e-3,
        fg_threshold: 0.95,
        bg_threshold: 0.04,
        erode_size: 6,
        feather_radius: 3,
        harden_edges: false,
    };

    /// Small window, strong smoothing, aggressive thresholds
    pub const HARD: Self = Self {
        guided_radius: 4,
        guided_epsilon: 1e-2,
        fg_threshold: 0.85,
        bg_threshold: 0.15,
        erode_size: 8,
        feather_radius: 1,
        harden_edges: true,
    };

    #[must_use]
    pub const fn for_mode(mode: RefineMode) -> Self {
        match mode {
            RefineMode::Soft => Self::SOFT,
            RefineMode::Hard => Self::HARD,
        }
    }

    #[must_use]
    pub const fn trimap_params(&self) -> TrimapParams {
        TrimapParams {
            fg_threshold: self.fg_threshold,
            bg_threshold: self.bg_threshold,
            erode_size: self.erode_size,
        }
    }
}

impl From<RefineMode> for ModePreset {
    fn from(mode: RefineMode) -> Self {
        Self::for_mode(mode)
    }
}

/// Pushes mid-range alpha towards 0 or 1
///
/// Values below [`HARDEN_LOW`] become 0 and values above [`HARDEN_HIGH`]
/// become 1; the band in between follows a smoothstep.
#[must_use]
pub fn harden_edges(mask: &Image<Luma<f32>>) -> Image<Luma<f32>> {
    map_colors(mask, |Luma([v])| {
        Luma([if v < HARDEN_LOW {
            0.0
        } else if v > HARDEN_HIGH {
            1.0
        } else {
            let t = (v - HARDEN_LOW) / (HARDEN_HIGH - HARDEN_LOW + DIVISION_EPSILON);
            t * t * 2.0f32.mul_add(-t, 3.0)
        }])
    })
}

/// Receives coarse progress checkpoints between pipeline stages
pub trait ProgressSink {
    fn report(&mut self, stage: &str, percent: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, u8),
{
    fn report(&mut self, stage: &str, percent: u8) {
        self(stage, percent);
    }
}

/// Progress sink that discards every checkpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: &str, _percent: u8) {}
}

/// One step of the refinement pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Uncertainty map at model resolution
    DetectUncertainty,
    /// Bilinear upscale of mask and uncertainty to guide resolution
    Upscale,
    /// Edge-aware smoothing along the guide's luminance
    GuidedFilter,
    /// Trimap construction and colour-sample matting
    TrimapMatting,
    /// Normalised Sobel magnitude of the guide
    Gradient,
    /// Gradient-aware feathering of transitions
    Feather,
    /// Piecewise push of mid alpha towards 0 or 1
    HardenEdges,
    /// Alpha write-back and edge colour decontamination
    Defringe,
}

impl Stage {
    /// Stage identifier reported to progress sinks
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DetectUncertainty => "detect_uncertainty",
            Self::Upscale => "upscale",
            Self::GuidedFilter => "guided_filter",
            Self::TrimapMatting => "trimap_matting",
            Self::Gradient => "gradient",
            Self::Feather => "feather",
            Self::HardenEdges => "harden_edges",
            Self::Defringe => "defringe",
        }
    }

    /// Percent complete once this stage has finished
    #[must_use]
    pub const fn progress(&self) -> u8 {
        match self {
            Self::DetectUncertainty => 10,
            Self::Upscale => 20,
            Self::GuidedFilter => 40,
            Self::TrimapMatting => 60,
            Self::Gradient => 70,
            Self::Feather => 80,
            Self::HardenEdges => 85,
            Self::Defringe => 100,
        }
    }

    /// Runs this stage against the intermediates in `state`
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DimensionMismatch` when a full-resolution stage
    /// runs before [`Stage::Upscale`], and `MatteError::InvalidParameter` for
    /// an invalid guided-filter preset. Insufficient colour samples are not
    /// an error here; they are recorded in `state` instead.
    pub fn apply(&self, preset: &ModePreset, state: &mut StageState<'_>) -> MatteResult<()> {
        match self {
            Self::DetectUncertainty => {
                state.uncertainty = Some(uncertainty_map(&state.mask));
            }
            Self::Upscale => {
                let (width, height) = state.guide.dimensions();
                state.mask = resize_bilinear(&state.mask, width, height);
                let uncertainty = state
                    .uncertainty
                    .take()
                    .unwrap_or_else(|| uncertainty_map(&state.mask));
                state.uncertainty = Some(resize_bilinear(&uncertainty, width, height));
            }
            Self::GuidedFilter => {
                let filter = GuidedMaskFilter::new(preset.guided_radius, preset.guided_epsilon)?;
                let luminance = luminance_image(state.guide);
                state.mask = filter.filter(&state.mask, &luminance)?;
            }
            Self::TrimapMatting => {
                match refine_with_color_samples(&state.mask, state.guide, &preset.trimap_params()) {
                    Ok(mask) => state.mask = mask,
                    Err(err) if err.is_soft_fallback() => {
                        warn!("Skipping colour matting: {err}");
                        state.soft_fallbacks.push(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            Self::Gradient => {
                state.gradient = Some(sobel_magnitude(state.guide));
            }
            Self::Feather => {
                let gradient = state
                    .gradient
                    .take()
                    .unwrap_or_else(|| sobel_magnitude(state.guide));
                let uncertainty = state
                    .uncertainty
                    .take()
                    .unwrap_or_else(|| uncertainty_map(&state.mask));
                let feather = GradientFeather::new(preset.feather_radius);
                state.mask = feather.apply(&state.mask, &gradient, &uncertainty)?;
                state.gradient = Some(gradient);
                state.uncertainty = Some(uncertainty);
            }
            Self::HardenEdges => {
                state.mask = harden_edges(&state.mask);
            }
            Self::Defringe => {
                let with_alpha = state.guide.with_alpha(&to_byte_mask(&state.mask))?;
                state.output = Some(Defringe::default().apply(&with_alpha));
            }
        }
        Ok(())
    }
}

/// Intermediate buffers handed from stage to stage
#[derive(Debug, Clone)]
pub struct StageState<'a> {
    guide: &'a Image<Rgba<u8>>,
    mask: Image<Luma<f32>>,
    uncertainty: Option<Image<Luma<f32>>>,
    gradient: Option<Image<Luma<f32>>>,
    output: Option<Image<Rgba<u8>>>,
    soft_fallbacks: Vec<MatteError>,
}

impl<'a> StageState<'a> {
    /// Starts from a raw byte mask at model resolution
    #[must_use]
    pub fn new(raw_mask: &Image<Luma<u8>>, guide: &'a Image<Rgba<u8>>) -> Self {
        Self {
            guide,
            mask: to_unit_mask(raw_mask),
            uncertainty: None,
            gradient: None,
            output: None,
            soft_fallbacks: Vec::new(),
        }
    }

    /// Current working mask
    #[must_use]
    pub const fn mask(&self) -> &Image<Luma<f32>> {
        &self.mask
    }

    #[must_use]
    pub const fn uncertainty(&self) -> Option<&Image<Luma<f32>>> {
        self.uncertainty.as_ref()
    }

    #[must_use]
    pub const fn gradient(&self) -> Option<&Image<Luma<f32>>> {
        self.gradient.as_ref()
    }

    #[must_use]
    pub fn soft_fallbacks(&self) -> &[MatteError] {
        &self.soft_fallbacks
    }

    /// Final RGBA, writing the current mask into the guide if
    /// [`Stage::Defringe`] has not run
    ///
    /// # Errors
    ///
    /// Returns `MatteError::DimensionMismatch` if the mask was never upscaled
    /// to guide resolution.
    pub fn finish(self) -> MatteResult<RefinedMatte> {
        let image = match self.output {
            Some(image) => image,
            None => self.guide.with_alpha(&to_byte_mask(&self.mask))?,
        };
        Ok(RefinedMatte {
            image,
            soft_fallbacks: self.soft_fallbacks,
        })
    }
}

/// Pipeline output
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedMatte {
    /// Guide colours with the refined alpha
    pub image: Image<Rgba<u8>>,
    /// Recoverable degeneracies absorbed during the run
    pub soft_fallbacks: Vec<MatteError>,
}

/// Raw low-resolution mask plus full-resolution guide to final RGBA
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskRefinementPipeline {
    mode: RefineMode,
    preset: ModePreset,
}

impl MaskRefinementPipeline {
    /// Creates a pipeline using the preset table entry for `mode`
    #[must_use]
    pub const fn new(mode: RefineMode) -> Self {
        Self {
            mode,
            preset: ModePreset::for_mode(mode),
        }
    }

    /// Creates a pipeline with a custom preset
    #[must_use]
    pub const fn with_preset(mode: RefineMode, preset: ModePreset) -> Self {
        Self { mode, preset }
    }

    #[must_use]
    pub const fn mode(&self) -> RefineMode {
        self.mode
    }

    #[must_use]
    pub const fn preset(&self) -> &ModePreset {
        &self.preset
    }

    /// Stages in execution order
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![
            Stage::DetectUncertainty,
            Stage::Upscale,
            Stage::GuidedFilter,
            Stage::TrimapMatting,
            Stage::Gradient,
            Stage::Feather,
        ];
        if self.preset.harden_edges {
            stages.push(Stage::HardenEdges);
        }
        stages.push(Stage::Defringe);
        stages
    }

    /// Refines `raw_mask` against `guide`
    ///
    /// # Errors
    ///
    /// * `MatteError::DegenerateImage` if either image has a zero side
    /// * `MatteError::InvalidParameter` if the preset is invalid
    pub fn run(
        &self,
        raw_mask: &Image<Luma<u8>>,
        guide: &Image<Rgba<u8>>,
    ) -> MatteResult<RefinedMatte> {
        self.run_with_progress(raw_mask, guide, &mut NoProgress)
    }

    /// Like [`run`](Self::run), reporting a checkpoint after every stage
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_progress<S>(
        &self,
        raw_mask: &Image<Luma<u8>>,
        guide: &Image<Rgba<u8>>,
        progress: &mut S,
    ) -> MatteResult<RefinedMatte>
    where
        S: ProgressSink + ?Sized,
    {
        validate_non_empty_image(raw_mask.width(), raw_mask.height())?;
        validate_non_empty_image(guide.width(), guide.height())?;

        info!(
            "Refining {}x{} mask against {}x{} guide ({} mode)",
            raw_mask.width(),
            raw_mask.height(),
            guide.width(),
            guide.height(),
            self.mode
        );

        let mut state = StageState::new(raw_mask, guide);
        for stage in self.stages() {
            stage.apply(&self.preset, &mut state)?;
            debug!("Stage {} complete", stage.name());
            progress.report(stage.name(), stage.progress());
        }
        state.finish()
    }
}
