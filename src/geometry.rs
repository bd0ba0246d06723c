//! Viewport geometry in device-independent pixels.

use serde::{Deserialize, Serialize};

// ============================================================================
// Point
// ============================================================================

/// Pointer position in viewport (CSS) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Region
// ============================================================================

/// Selection rectangle in viewport (CSS) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// Creates a region from origin and size.
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Normalized rectangle spanning two corner points, in any drag direction.
    #[must_use]
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Returns `true` if both edges are strictly greater than `min_size`.
    #[inline]
    #[must_use]
    pub fn exceeds(&self, min_size: f64) -> bool {
        self.width > min_size && self.height > min_size
    }

    /// Scales the region by the device pixel ratio, rounding each component.
    ///
    /// Origin and size are rounded independently, so the physical size is
    /// always `round(size * dpr)` regardless of where the region starts.
    #[must_use]
    pub fn to_physical(&self, device_pixel_ratio: f64) -> PhysicalRect {
        PhysicalRect {
            x: round_px(self.left * device_pixel_ratio),
            y: round_px(self.top * device_pixel_ratio),
            width: round_px(self.width * device_pixel_ratio).max(0) as u32,
            height: round_px(self.height * device_pixel_ratio).max(0) as u32,
        }
    }
}

// ============================================================================
// PhysicalRect
// ============================================================================

/// Rectangle in captured-image pixels.
///
/// The origin may be negative or past the image edge; cropping pads
/// out-of-bounds pixels with transparent black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhysicalRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Rounds to the nearest integer. Viewport coordinates are never negative,
/// so this agrees with the page's `Math.round`.
#[inline]
fn round_px(value: f64) -> i64 {
    value.round() as i64
}

// ============================================================================
// Tests
// ============================================================================
