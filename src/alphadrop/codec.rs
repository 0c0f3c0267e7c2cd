use std::io::Cursor;

use image::{ImageFormat, Rgba};
use imageproc::definitions::Image;
use imageproc::map::map_colors;

use crate::error::{MatteError, MatteResult};
use crate::utils::validate_non_empty_image;

/// Decodes an image file into an opaque RGBA buffer
///
/// Any transparency in the source is composited onto white, so every pixel
/// of the result has alpha 255.
///
/// # Errors
///
/// * `MatteError::Codec` if the bytes cannot be decoded
/// * `MatteError::DegenerateImage` if the decoded image is empty
pub fn load_rgba(bytes: &[u8]) -> MatteResult<Image<Rgba<u8>>> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| MatteError::Codec(err.to_string()))?
        .to_rgba8();
    validate_non_empty_image(decoded.width(), decoded.height())?;
    Ok(flatten_onto_white(&decoded))
}

/// Composites every pixel onto an opaque white background
#[must_use]
pub fn flatten_onto_white(image: &Image<Rgba<u8>>) -> Image<Rgba<u8>> {
    map_colors(image, |Rgba([r, g, b, a])| {
        let alpha = u32::from(a);
        let blend = |channel: u8| ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgba([blend(r), blend(g), blend(b), 255])
    })
}

/// Encodes an RGBA buffer as PNG
///
/// # Errors
///
/// Returns `MatteError::Codec` if encoding fails.
pub fn encode_png(image: &Image<Rgba<u8>>) -> MatteResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| MatteError::Codec(err.to_string()))?;
    Ok(bytes)
}
