//! Bundled QR decoding.
//!
//! The decoder runs locally on the cropped RGBA buffer; nothing is fetched
//! at runtime. [`RqrrDecoder`] grayscales with Rec.709 weights and tries
//! normal and inverted luminance according to [`InversionMode`].

// ============================================================================
// Imports
// ============================================================================

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ============================================================================
// Constants
// ============================================================================

/// Rec.709 luma weights.
const WEIGHT_R: f32 = 0.2126;
const WEIGHT_G: f32 = 0.7152;
const WEIGHT_B: f32 = 0.0722;

// ============================================================================
// InversionMode
// ============================================================================

/// Which luminance polarities the decoder tries, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InversionMode {
    /// Normal first, then inverted.
    #[default]
    AttemptBoth,
    /// Normal only.
    DontInvert,
    /// Inverted first, then normal.
    InvertFirst,
    /// Inverted only.
    OnlyInvert,
}

impl InversionMode {
    /// Polarities to try, `true` meaning inverted.
    #[must_use]
    pub fn passes(&self) -> &'static [bool] {
        match self {
            Self::AttemptBoth => &[false, true],
            Self::DontInvert => &[false],
            Self::InvertFirst => &[true, false],
            Self::OnlyInvert => &[true],
        }
    }
}

// ============================================================================
// QrDecoder
// ============================================================================

/// Decodes a QR payload from an RGBA pixel buffer.
///
/// Returns `None` when no code could be decoded.
pub trait QrDecoder: Send + Sync {
    fn decode(&self, pixels: &RgbaImage) -> Option<String>;
}

// ============================================================================
// RqrrDecoder
// ============================================================================

/// Locally bundled decoder backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder {
    inversion: InversionMode,
}

impl RqrrDecoder {
    #[inline]
    #[must_use]
    pub fn new(inversion: InversionMode) -> Self {
        Self { inversion }
    }

    /// Decodes the first readable grid from a luminance buffer.
    fn decode_luma(luma: &[u8], width: usize, height: usize, inverted: bool) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            let value = luma[y * width + x];
            if inverted { 255 - value } else { value }
        });

        let grids = prepared.detect_grids();
        trace!(grids = grids.len(), inverted, "Detected candidate grids");

        grids.into_iter().find_map(|grid| match grid.decode() {
            Ok((_, content)) => Some(content),
            Err(e) => {
                trace!(error = ?e, "Grid failed to decode");
                None
            }
        })
    }
}

impl QrDecoder for RqrrDecoder {
    fn decode(&self, pixels: &RgbaImage) -> Option<String> {
        let (width, height) = (pixels.width() as usize, pixels.height() as usize);
        if width == 0 || height == 0 {
            return None;
        }

        let luma = grayscale(pixels);

        for &inverted in self.inversion.passes() {
            if let Some(content) = Self::decode_luma(&luma, width, height, inverted) {
                debug!(inverted, len = content.len(), "QR payload decoded");
                return Some(content);
            }
        }

        debug!(width, height, "No QR payload found");
        None
    }
}

/// Converts RGBA to 8-bit luminance; alpha is ignored.
#[must_use]
pub fn grayscale(pixels: &RgbaImage) -> Vec<u8> {
    pixels
        .pixels()
        .map(|p| {
            let [r, g, b, _] = p.0;
            let y = f32::from(r) * WEIGHT_R + f32::from(g) * WEIGHT_G + f32::from(b) * WEIGHT_B;
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
