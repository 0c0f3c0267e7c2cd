//! Alpha-matte refinement and background removal on top of `image` and
//! `imageproc`.
//!
//! Three entry families are provided:
//!
//! * [`MaskRefinementPipeline`] turns a coarse model mask into a
//!   full-resolution matte guided by the source image.
//! * [`ColorSegmenter`] and [`BackgroundRemover`] cut plain backgrounds
//!   without a model and pick a method automatically.
//! * [`RefinementSession`] and [`EraserBrush`] back interactive editing of
//!   an existing alpha channel.
//!
//! Byte-buffer equivalents of the main operations live in the crate root as
//! [`refine_model_mask`], [`segment_by_color`], [`apply_refinement`] and
//! [`erase_stroke`].

mod alphadrop;
mod error;
mod utils;

#[cfg(test)]
mod test_utils;

pub use alphadrop::alpha::ReplaceAlpha;
pub use alphadrop::analysis::{
    analyze, color_confidence, color_entropy, edge_density, foreground_ratio, matting_confidence,
    segmentation_confidence, AnalyzerConfig, ImageAnalysis, RemovalMethod,
};
pub use alphadrop::box_filter::{box_filter, BoxFilter};
pub use alphadrop::buffers::{apply_refinement, erase_stroke, refine_model_mask, segment_by_color};
#[cfg(feature = "codec")]
pub use alphadrop::codec::{encode_png, flatten_onto_white, load_rgba};
pub use alphadrop::color_segmenter::ColorSegmenter;
pub use alphadrop::convert_color::{luminance, Hsl};
pub use alphadrop::defringe::Defringe;
pub use alphadrop::engine::{
    BackgroundRemover, MaskModel, NoModel, RemovalResult, FALLBACK_CONFIDENCE_FACTOR,
};
pub use alphadrop::eraser::EraserBrush;
pub use alphadrop::feather::{sobel_magnitude, uncertainty_map, GradientFeather};
pub use alphadrop::guided_filter::{GuidedFilterExt, GuidedMaskFilter};
pub use alphadrop::morphology::{BorderPolicy, Morphology};
pub use alphadrop::pipeline::{
    harden_edges, MaskRefinementPipeline, ModePreset, NoProgress, ProgressSink, RefineMode,
    RefinedMatte, Stage, StageState,
};
pub use alphadrop::refinement::{
    feather_edges, grow_shrink, refine_alpha, smooth_alpha, BaselineSnapshot, RefinementJob,
    RefinementOutput, RefinementParams, RefinementSession,
};
pub use alphadrop::resample::resize_bilinear;
pub use alphadrop::summed_area_table::{CreateSummedAreaTable, SummedAreaTable};
pub use alphadrop::trimap::{
    build_trimap, refine_with_color_samples, ColorSamples, TrimapParams, TRIMAP_BACKGROUND,
    TRIMAP_FOREGROUND, TRIMAP_UNKNOWN,
};
pub use error::{BufferKind, MatteError, MatteResult};

pub use imageproc::definitions::Image;
