//! Pure geometry for collage rendering.
//!
//! All functions here are pure and testable without any I/O or images.
//! Preview and export call the same functions, which is what keeps the two
//! pixel-consistent apart from resolution.

use super::params::{CropRect, PixelRect};
use crate::layout::Cell;

/// Smallest aspect ratio accepted when deriving a height from a width.
pub const MIN_ASPECT_RATIO: f64 = 0.01;

/// Overflow below this many pixels counts as "no panning room".
const OVERFLOW_EPSILON: f64 = 1e-6;

/// Scale that makes a `source` image cover a `dest` box (the larger of the
/// two axis ratios).
pub fn cover_scale(source: (f64, f64), dest: (f64, f64)) -> f64 {
    let (sw, sh) = source;
    let (dw, dh) = dest;
    (dw / sw).max(dh / sh)
}

/// Compute the source sub-rectangle that, scaled to `dest`, fills it exactly.
///
/// The crop window is panned within the source by the focal point:
/// `(0, 0)` keeps the top-left, `(1, 1)` the bottom-right, `(0.5, 0.5)` centers.
///
/// # Examples
/// ```
/// # use photo_collage::imaging::cover_crop;
/// // 800x600 landscape into a square cell: 600x600 window, centered.
/// let crop = cover_crop((800.0, 600.0), (300.0, 300.0), (0.5, 0.5));
/// assert_eq!((crop.x, crop.y, crop.width, crop.height), (100.0, 0.0, 600.0, 600.0));
/// ```
pub fn cover_crop(source: (f64, f64), dest: (f64, f64), focus: (f64, f64)) -> CropRect {
    let (sw, sh) = source;
    let (dw, dh) = dest;
    let scale = cover_scale(source, dest);
    let width = dw / scale;
    let height = dh / scale;
    let max_offset_x = (sw - width).max(0.0);
    let max_offset_y = (sh - height).max(0.0);
    CropRect {
        x: max_offset_x * focus.0.clamp(0.0, 1.0),
        y: max_offset_y * focus.1.clamp(0.0, 1.0),
        width,
        height,
    }
}

/// How far a cover-scaled image extends past its cell, in cell pixels.
///
/// This is the panning room a focal-point drag moves through. An axis that
/// fits exactly reports `0.0`.
pub fn cover_overflow(natural: (f64, f64), cell: (f64, f64)) -> (f64, f64) {
    let scale = cover_scale(natural, cell);
    let snap = |v: f64| if v < OVERFLOW_EPSILON { 0.0 } else { v };
    (
        snap((natural.0 * scale - cell.0).max(0.0)),
        snap((natural.1 * scale - cell.1).max(0.0)),
    )
}

/// Destination rectangle for a cell on a `target`-sized canvas, inset by
/// half the gutter on every side.
///
/// Edges are rounded, not sizes, so neighbouring cells sharing an edge are
/// always exactly one gutter apart. Returns `None` when the rounded width or
/// height is not positive.
pub fn cell_rect(cell: &Cell, target: (u32, u32), gutter: f64) -> Option<PixelRect> {
    let (tw, th) = (f64::from(target.0), f64::from(target.1));
    let inset = gutter.max(0.0) / 2.0;
    let left = (cell.x * tw + inset).round();
    let top = (cell.y * th + inset).round();
    let right = ((cell.x + cell.width) * tw - inset).round();
    let bottom = ((cell.y + cell.height) * th - inset).round();
    let (width, height) = (right - left, bottom - top);
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(PixelRect {
        x: left as i32,
        y: top as i32,
        width: width as u32,
        height: height as u32,
    })
}

/// Corner radius actually drawn: the configured radius shrunk by half the
/// gutter, so the outer rounding looks the same at any spacing.
pub fn effective_corner_radius(corner_radius: f64, gutter: f64) -> f64 {
    (corner_radius - gutter / 2.0).max(0.0)
}

/// Radius that can be drawn on a `width`×`height` box without the corners
/// overlapping.
pub fn clamp_corner_radius(radius: f64, width: f64, height: f64) -> f64 {
    radius.min(width.min(height) / 2.0).max(0.0)
}

/// Canvas size for a given width and aspect ratio (`width / height`).
pub fn canvas_dimensions(width: u32, aspect_ratio: f64) -> (u32, u32) {
    let ratio = if aspect_ratio.is_finite() {
        aspect_ratio.max(MIN_ASPECT_RATIO)
    } else {
        1.0
    };
    let height = (f64::from(width) / ratio).round().max(1.0);
    (width, height as u32)
}
