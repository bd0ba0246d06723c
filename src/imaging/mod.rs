//! Screenshot decoding, cropping and QR decoding.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `data_url` | `data:` URL to RGBA buffer |
//! | `crop` | DPR-aware crop to the selection |
//! | `decoder` | [`QrDecoder`] trait and the bundled [`RqrrDecoder`] |

// ============================================================================
// Submodules
// ============================================================================

mod crop;
mod data_url;
pub(crate) mod decoder;

// ============================================================================
// Re-exports
// ============================================================================

pub use crop::{crop_physical, crop_scaled};
pub use data_url::{data_url_bytes, decode_data_url, encode_png_data_url};
pub use decoder::{InversionMode, QrDecoder, RqrrDecoder, grayscale};
