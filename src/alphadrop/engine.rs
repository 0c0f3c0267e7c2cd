//! Method selection and fallback around the two mask sources.
//!
//! The neural model is an external collaborator behind [`MaskModel`]. When
//! it fails, or none is configured, the remover falls back to the colour
//! heuristic and lowers the reported confidence.

use image::{Luma, Rgba};
use imageproc::definitions::Image;
use log::{info, warn};

use crate::alphadrop::alpha::ReplaceAlpha;
use crate::alphadrop::analysis::{
    color_confidence, matting_confidence, segmentation_confidence, AnalyzerConfig, ImageAnalysis,
    RemovalMethod,
};
use crate::alphadrop::color_segmenter::ColorSegmenter;
use crate::alphadrop::convert_color::alpha_channel;
use crate::alphadrop::pipeline::MaskRefinementPipeline;
use crate::error::{MatteError, MatteResult};
use crate::utils::validate_non_empty_image;

/// Confidence multiplier applied when a fallback method produced the result
pub const FALLBACK_CONFIDENCE_FACTOR: f32 = 0.8;

/// Produces a coarse foreground probability mask for an image
///
/// The mask may have any resolution; it is upscaled to the image during
/// refinement.
pub trait MaskModel {
    /// # Errors
    ///
    /// Implementations report inference failures as `MatteError::Model`.
    fn predict(&self, image: &Image<Rgba<u8>>) -> MatteResult<Image<Luma<u8>>>;
}

impl<F> MaskModel for F
where
    F: Fn(&Image<Rgba<u8>>) -> MatteResult<Image<Luma<u8>>>,
{
    fn predict(&self, image: &Image<Rgba<u8>>) -> MatteResult<Image<Luma<u8>>> {
        self(image)
    }
}

/// Placeholder for removers without a model
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModel;

impl MaskModel for NoModel {
    fn predict(&self, _image: &Image<Rgba<u8>>) -> MatteResult<Image<Luma<u8>>> {
        Err(MatteError::Model("no mask model configured".to_owned()))
    }
}

/// Outcome of one background removal
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalResult {
    /// Source colours with the computed alpha
    pub image: Image<Rgba<u8>>,
    /// Quality estimate in [0, 1]
    pub confidence: f32,
    /// Method that actually produced the image
    pub method: RemovalMethod,
    /// Statistics, when the method was selected automatically
    pub analysis: Option<ImageAnalysis>,
    /// Recoverable degeneracies absorbed while refining
    pub soft_fallbacks: Vec<MatteError>,
}

/// Background remover combining a mask model and the colour heuristic
#[derive(Debug, Clone)]
pub struct BackgroundRemover<M = NoModel> {
    model: M,
    segmenter: ColorSegmenter,
    analyzer: AnalyzerConfig,
}

impl BackgroundRemover<NoModel> {
    /// Remover that only has the colour heuristic
    #[must_use]
    pub fn color_only() -> Self {
        Self::with_model(NoModel)
    }
}

impl Default for BackgroundRemover<NoModel> {
    fn default() -> Self {
        Self::color_only()
    }
}

impl<M: MaskModel> BackgroundRemover<M> {
    #[must_use]
    pub fn with_model(model: M) -> Self {
        Self {
            model,
            segmenter: ColorSegmenter::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_segmenter(mut self, segmenter: ColorSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Removes the background with `method`, or an automatically chosen one
    /// when `method` is `None`
    ///
    /// A failing model-based method falls back to segmentation and then to
    /// the colour heuristic; the confidence of a fallback result is scaled by
    /// [`FALLBACK_CONFIDENCE_FACTOR`].
    ///
    /// # Errors
    ///
    /// `MatteError::DegenerateImage` for an empty image, or the last error if
    /// every method failed.
    pub fn remove(
        &self,
        image: &Image<Rgba<u8>>,
        method: Option<RemovalMethod>,
    ) -> MatteResult<RemovalResult> {
        validate_non_empty_image(image.width(), image.height())?;

        let (method, analysis) = match method {
            Some(method) => (method, None),
            None => {
                let analysis = self.analyzer.analyze(image)?;
                info!("Auto-selected method {}", analysis.recommended);
                (analysis.recommended, Some(analysis))
            }
        };

        let err = match self.run_method(image, method) {
            Ok(result) => return Ok(RemovalResult { analysis, ..result }),
            Err(err) => err,
        };
        warn!("Method {method} failed: {err}");

        let mut last_error = err;
        for fallback in [RemovalMethod::Segmentation, RemovalMethod::Color] {
            if fallback == method {
                continue;
            }
            info!("Trying fallback method {fallback}");
            match self.run_method(image, fallback) {
                Ok(result) => {
                    return Ok(RemovalResult {
                        confidence: result.confidence * FALLBACK_CONFIDENCE_FACTOR,
                        analysis,
                        ..result
                    })
                }
                Err(err) => {
                    warn!("Fallback method {fallback} failed: {err}");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    fn run_method(
        &self,
        image: &Image<Rgba<u8>>,
        method: RemovalMethod,
    ) -> MatteResult<RemovalResult> {
        let Some(mode) = method.refine_mode() else {
            let mask = self.segmenter.segment(image)?;
            return Ok(RemovalResult {
                image: image.with_alpha(&mask)?,
                confidence: color_confidence(&mask),
                method,
                analysis: None,
                soft_fallbacks: Vec::new(),
            });
        };

        let raw_mask = self.model.predict(image)?;
        let matte = MaskRefinementPipeline::new(mode).run(&raw_mask, image)?;
        let alpha = alpha_channel(&matte.image);
        let confidence = match method {
            RemovalMethod::Matting => matting_confidence(&alpha),
            _ => segmentation_confidence(&alpha),
        };
        Ok(RemovalResult {
            image: matte.image,
            confidence,
            method,
            analysis: None,
            soft_fallbacks: matte.soft_fallbacks,
        })
    }
}
