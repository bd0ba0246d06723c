//! Decoding of captured screenshot data URLs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use image::RgbaImage;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

// ============================================================================
// Decoding
// ============================================================================

/// Splits a `data:<mime>;base64,<payload>` URL and returns the raw bytes.
///
/// # Errors
///
/// Returns [`Error::ImageDecode`] if the URL is not a base64 data URL or
/// the payload is not valid base64.
pub fn data_url_bytes(data_url: &str) -> Result<Vec<u8>> {
    let rest = data_url
        .strip_prefix(DATA_SCHEME)
        .ok_or_else(|| Error::image_decode("not a data URL"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::image_decode("data URL has no payload"))?;

    if !header.ends_with(BASE64_MARKER) {
        return Err(Error::image_decode("data URL is not base64-encoded"));
    }

    Base64Standard
        .decode(payload.trim())
        .map_err(|e| Error::image_decode(format!("invalid base64: {e}")))
}

/// Decodes a screenshot data URL into an RGBA pixel buffer.
///
/// # Errors
///
/// Returns [`Error::ImageDecode`] if the URL or the image inside it cannot
/// be decoded.
pub fn decode_data_url(data_url: &str) -> Result<RgbaImage> {
    let bytes = data_url_bytes(data_url)?;

    let image = image::load_from_memory(&bytes)
        .map_err(|e| Error::image_decode(e.to_string()))?
        .to_rgba8();

    debug!(
        width = image.width(),
        height = image.height(),
        "Decoded captured screenshot"
    );

    Ok(image)
}

/// Encodes an RGBA buffer as a PNG data URL, as the capture primitive does.
///
/// # Errors
///
/// Returns [`Error::ImageDecode`] if PNG encoding fails.
pub fn encode_png_data_url(image: &RgbaImage) -> Result<String> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| Error::image_decode(e.to_string()))?;

    Ok(format!(
        "data:image/png;base64,{}",
        Base64Standard.encode(bytes)
    ))
}

// ============================================================================
// Tests
// ============================================================================
