//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the geometry in [`calculations`](super::calculations)
//! and the pixel work in [`operations`](super::operations) and the
//! [`backend`](super::backend).
//!
//! ## Types
//!
//! - [`Quality`] — JPEG encoding quality (1–100, default 92). Clamped on construction.
//! - [`CropRect`] — Source sub-rectangle in fractional source pixels.
//! - [`PixelRect`] — Destination rectangle on the canvas in whole pixels.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// Source sub-rectangle, in source pixels. Fractional: snapping to the pixel
/// grid happens only when the crop is cut out of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    /// Snap to whole pixels inside a `bounds`-sized bitmap.
    ///
    /// The result is always at least 1×1 and never extends past the bitmap.
    pub fn to_pixels(&self, bounds: (u32, u32)) -> (u32, u32, u32, u32) {
        let (bw, bh) = bounds;
        let x = (self.x.floor().max(0.0) as u32).min(bw.saturating_sub(1));
        let y = (self.y.floor().max(0.0) as u32).min(bh.saturating_sub(1));
        let w = (self.width.round() as u32).clamp(1, bw - x);
        let h = (self.height.round() as u32).clamp(1, bh - y);
        (x, y, w, h)
    }
}

/// Destination rectangle on the canvas, in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
