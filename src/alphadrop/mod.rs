pub mod alpha;
pub mod analysis;
pub mod box_filter;
pub mod buffers;
#[cfg(feature = "codec")]
pub mod codec;
pub mod color_segmenter;
pub mod convert_color;
pub mod defringe;
pub mod engine;
pub mod eraser;
pub mod feather;
pub mod guided_filter;
pub mod morphology;
pub mod pipeline;
pub mod refinement;
pub mod resample;
pub mod summed_area_table;
pub mod trimap;
