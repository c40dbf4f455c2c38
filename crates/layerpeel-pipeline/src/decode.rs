//! Image decoding and encoding at the byte boundary.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, GIF) and produces the
//! uniform RGBA buffer every other stage operates on. [`encode_png`] is the
//! inverse used wherever a buffer must leave the process (collaborator
//! payloads, exported sprites, debug snapshots) with transparency intact.

use crate::types::{PipelineError, RgbaImage};

/// Decode raw image bytes into an RGBA buffer.
///
/// Supports whatever the `image` crate was built to decode. Images
/// without an alpha channel come back fully opaque.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.into_rgba8())
}

/// Encode an RGBA buffer as PNG bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] for a zero-sized buffer (PNG
/// cannot represent it) and [`PipelineError::ImageDecode`] if the encoder
/// fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}
