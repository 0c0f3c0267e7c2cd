//! Entry points over raw interleaved byte buffers.
//!
//! RGBA buffers hold `4 * width * height` bytes and masks `width * height`
//! bytes, row-major. Lengths are validated before any processing starts, so
//! a malformed buffer fails the whole call without a partial result.

use image::{ImageBuffer, Luma, Rgba};
use imageproc::definitions::Image;

use crate::alphadrop::color_segmenter::ColorSegmenter;
use crate::alphadrop::eraser::EraserBrush;
use crate::alphadrop::pipeline::{MaskRefinementPipeline, RefineMode};
use crate::alphadrop::refinement::{BaselineSnapshot, RefinementParams};
use crate::error::{BufferKind, MatteError, MatteResult};
use crate::utils::{image_from_slice, validate_buffer_len};

/// Refines a model-resolution mask against a full-resolution RGBA guide
///
/// Returns the guide's colours with the refined alpha.
///
/// # Errors
///
/// `MatteError::InvalidBufferSize` if `raw_mask` is not
/// `model_width * model_height` bytes or `guide` is not
/// `4 * image_width * image_height` bytes, and `MatteError::DegenerateImage`
/// for a zero dimension.
pub fn refine_model_mask(
    raw_mask: &[u8],
    model_width: u32,
    model_height: u32,
    guide: &[u8],
    image_width: u32,
    image_height: u32,
    mode: RefineMode,
) -> MatteResult<Vec<u8>> {
    let mask: Image<Luma<u8>> = image_from_slice(BufferKind::Mask, raw_mask, model_width, model_height)?;
    let guide: Image<Rgba<u8>> = image_from_slice(BufferKind::Guide, guide, image_width, image_height)?;

    let matte = MaskRefinementPipeline::new(mode).run(&mask, &guide)?;
    Ok(matte.image.into_raw())
}

/// Removes the background of an RGBA image without a model
///
/// # Errors
///
/// `MatteError::InvalidBufferSize` for a malformed buffer and
/// `MatteError::DegenerateImage` for a zero dimension.
pub fn segment_by_color(guide: &[u8], width: u32, height: u32) -> MatteResult<Vec<u8>> {
    let guide: Image<Rgba<u8>> = image_from_slice(BufferKind::Guide, guide, width, height)?;
    Ok(ColorSegmenter::default().remove_background(&guide)?.into_raw())
}

/// Recomputes the alpha of `baseline` for the given slider values
///
/// Pure: identical inputs always give identical output, and
/// [`RefinementParams::IDENTITY`] returns the baseline bytes unchanged.
///
/// # Errors
///
/// `MatteError::InvalidBufferSize` for a malformed buffer and
/// `MatteError::DegenerateImage` for a zero dimension.
pub fn apply_refinement(
    baseline: &[u8],
    width: u32,
    height: u32,
    params: RefinementParams,
) -> MatteResult<Vec<u8>> {
    let baseline: Image<Rgba<u8>> = image_from_slice(BufferKind::Baseline, baseline, width, height)?;
    Ok(BaselineSnapshot::new(baseline)?.derive(&params).into_raw())
}

/// Cuts alpha to zero along a brush path, in place
///
/// # Errors
///
/// `MatteError::InvalidBufferSize` for a malformed canvas,
/// `MatteError::DegenerateImage` for a zero dimension and
/// `MatteError::InvalidParameter` for a non-positive brush diameter.
pub fn erase_stroke(
    canvas: &mut [u8],
    width: u32,
    height: u32,
    brush_diameter: f32,
    path: &[(f32, f32)],
) -> MatteResult<()> {
    validate_buffer_len(BufferKind::Canvas, canvas.len(), width, height, 4)?;
    let brush = EraserBrush::new(brush_diameter)?;

    let expected = canvas.len();
    let mut canvas: ImageBuffer<Rgba<u8>, &mut [u8]> = ImageBuffer::from_raw(width, height, canvas)
        .ok_or(MatteError::InvalidBufferSize {
            buffer: BufferKind::Canvas,
            width,
            height,
            expected,
            actual: expected,
        })?;
    brush.stroke(&mut canvas, path);
    Ok(())
}
