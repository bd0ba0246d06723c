//! Cropping the captured viewport to the on-screen selection.

use image::{RgbaImage, imageops};

use crate::geometry::{PhysicalRect, Region};

/// Crops `viewport` to the selection scaled by `device_pixel_ratio`.
///
/// The result is always exactly `round(width * dpr) x round(height * dpr)`.
/// Pixels outside the captured image are left transparent.
#[must_use]
pub fn crop_scaled(viewport: &RgbaImage, region: Region, device_pixel_ratio: f64) -> RgbaImage {
    crop_physical(viewport, region.to_physical(device_pixel_ratio))
}

/// Crops `viewport` to a rectangle already in captured-image pixels.
#[must_use]
pub fn crop_physical(viewport: &RgbaImage, rect: PhysicalRect) -> RgbaImage {
    let mut out = RgbaImage::new(rect.width, rect.height);

    let (vw, vh) = (i64::from(viewport.width()), i64::from(viewport.height()));

    // Intersection of the requested rectangle with the viewport.
    let src_left = rect.x.clamp(0, vw);
    let src_top = rect.y.clamp(0, vh);
    let src_right = (rect.x + i64::from(rect.width)).clamp(0, vw);
    let src_bottom = (rect.y + i64::from(rect.height)).clamp(0, vh);

    if src_right <= src_left || src_bottom <= src_top {
        return out;
    }

    let visible = imageops::crop_imm(
        viewport,
        src_left as u32,
        src_top as u32,
        (src_right - src_left) as u32,
        (src_bottom - src_top) as u32,
    )
    .to_image();

    imageops::replace(&mut out, &visible, src_left - rect.x, src_top - rect.y);
    out
}

// ============================================================================
// Tests
// ============================================================================
