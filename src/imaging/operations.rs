//! Pixel operations used by the render loop.
//!
//! These functions take geometry from [`calculations`](super::calculations)
//! and do the actual pixel work:
//!
//! - [`resample`] — cut the crop window out of a bitmap and scale it to the
//!   cell size with Lanczos3. Large downscale ratios (a 24 MP photo into a
//!   300 px cell) are the normal case, so nearest/bilinear are never used.
//! - [`rounded_rect_path`] — the clip outline for one cell.
//! - [`composite_cell`] — draw a resampled cell through its clip onto the
//!   canvas with anti-aliased edges.
//! - [`flatten_rgb`] — read the canvas back as RGB for encoding.

use super::calculations::clamp_corner_radius;
use super::params::{CropRect, PixelRect};
use crate::cancel::{CancelToken, Cancelled};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Paint, Path, PathBuilder, Pattern, Pixmap, Rect,
    SpreadMode, Transform,
};

/// Crop `bitmap` to `crop` and scale the window to `dest` pixels.
///
/// The crop is copied into an intermediate buffer first so the resize works
/// on a contiguous image. The token is checked before the crop, between the
/// crop and the resize, and after the resize.
pub fn resample(
    bitmap: &RgbaImage,
    crop: CropRect,
    dest: (u32, u32),
    token: &CancelToken,
) -> Result<RgbaImage, Cancelled> {
    token.check()?;
    let (x, y, w, h) = crop.to_pixels(bitmap.dimensions());
    let region = imageops::crop_imm(bitmap, x, y, w, h).to_image();
    token.check()?;
    let scaled = imageops::resize(&region, dest.0, dest.1, FilterType::Lanczos3);
    token.check()?;
    Ok(scaled)
}

/// Rounded-rectangle outline for `rect`.
///
/// Starts at the top edge `radius` in from the left corner, runs clockwise
/// along the four edges, each stopping `radius` short of its corner, and
/// turns each corner with a quadratic curve. The radius is clamped to half
/// the shorter side. A zero radius yields a plain rectangle.
pub fn rounded_rect_path(rect: PixelRect, radius: f64) -> Option<Path> {
    let (x, y) = (rect.x as f32, rect.y as f32);
    let (w, h) = (rect.width as f32, rect.height as f32);
    let r = clamp_corner_radius(radius, f64::from(w), f64::from(h)) as f32;
    if r <= 0.0 {
        return Some(PathBuilder::from_rect(Rect::from_xywh(x, y, w, h)?));
    }

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Premultiply an RGBA bitmap into a tiny-skia pixmap.
fn to_pixmap(img: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}

/// Draw `cell` at `rect` on `canvas`, clipped to a rounded rectangle.
///
/// `cell` must already be `rect`-sized. Returns `false` if nothing could be
/// drawn (zero-sized cell or degenerate path).
pub fn composite_cell(canvas: &mut Pixmap, cell: &RgbaImage, rect: PixelRect, radius: f64) -> bool {
    let Some(tile) = to_pixmap(cell) else {
        return false;
    };
    let Some(path) = rounded_rect_path(rect, radius) else {
        return false;
    };

    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.shader = Pattern::new(
        tile.as_ref(),
        SpreadMode::Pad,
        FilterQuality::Nearest,
        1.0,
        Transform::from_translate(rect.x as f32, rect.y as f32),
    );
    canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    true
}

/// Read the canvas back as straight (non-premultiplied) RGB.
pub fn flatten_rgb(canvas: &Pixmap) -> RgbImage {
    let mut out = RgbImage::new(canvas.width(), canvas.height());
    for (dst, px) in out.pixels_mut().zip(canvas.pixels()) {
        let c = px.demultiply();
        *dst = Rgb([c.red(), c.green(), c.blue()]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_rgba;
    use tiny_skia::Color;

    fn rect(x: i32, y: i32, width: u32, height: u32) -> PixelRect {
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }

    fn full_crop(w: u32, h: u32) -> CropRect {
        CropRect {
            x: 0.0,
            y: 0.0,
            width: f64::from(w),
            height: f64::from(h),
        }
    }

    #[test]
    fn resample_produces_destination_size() {
        let src = gradient_rgba(400, 300);
        let out = resample(&src, full_crop(400, 300), (37, 29), &CancelToken::new()).unwrap();
        assert_eq!(out.dimensions(), (37, 29));
    }

    #[test]
    fn resample_averages_fine_detail() {
        // 1px black/white checkerboard downscaled 8x must come out mid-grey,
        // which point sampling would not do.
        let src = RgbaImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let out = resample(&src, full_crop(64, 64), (8, 8), &CancelToken::new()).unwrap();
        for px in out.pixels() {
            assert!((100..=155).contains(&px[0]), "got {}", px[0]);
        }
    }

    #[test]
    fn resample_uses_crop_window() {
        // Left half red, right half blue; cropping the right half gives blue.
        let src = RgbaImage::from_fn(100, 50, |x, _| {
            if x < 50 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        let crop = CropRect {
            x: 50.0,
            y: 0.0,
            width: 50.0,
            height: 50.0,
        };
        let out = resample(&src, crop, (10, 10), &CancelToken::new()).unwrap();
        let center = out.get_pixel(5, 5);
        assert!(center[2] > 200 && center[0] < 50);
    }

    #[test]
    fn resample_honors_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let src = gradient_rgba(10, 10);
        assert_eq!(
            resample(&src, full_crop(10, 10), (5, 5), &token),
            Err(Cancelled)
        );
    }

    #[test]
    fn rounded_path_bounds_match_rect() {
        let path = rounded_rect_path(rect(10, 20, 100, 50), 12.0).unwrap();
        let b = path.bounds();
        assert_eq!((b.left(), b.top(), b.right(), b.bottom()), (10.0, 20.0, 110.0, 70.0));
    }

    #[test]
    fn rounded_path_handles_oversized_radius() {
        // radius > half the short side must still give a valid path
        assert!(rounded_rect_path(rect(0, 0, 10, 200), 500.0).is_some());
        assert!(rounded_rect_path(rect(0, 0, 10, 10), 0.0).is_some());
    }

    #[test]
    fn composite_clips_corners() {
        let mut canvas = Pixmap::new(100, 100).unwrap();
        canvas.fill(Color::WHITE);
        let red = RgbaImage::from_pixel(100, 100, image::Rgba([255, 0, 0, 255]));

        assert!(composite_cell(&mut canvas, &red, rect(0, 0, 100, 100), 30.0));

        let corner = canvas.pixel(1, 1).unwrap();
        assert_eq!((corner.red(), corner.green()), (255, 255), "corner shows background");
        let center = canvas.pixel(50, 50).unwrap();
        assert_eq!((center.red(), center.green()), (255, 0));
    }

    #[test]
    fn composite_square_corners_without_radius() {
        let mut canvas = Pixmap::new(20, 20).unwrap();
        canvas.fill(Color::WHITE);
        let blue = RgbaImage::from_pixel(10, 10, image::Rgba([0, 0, 255, 255]));

        composite_cell(&mut canvas, &blue, rect(5, 5, 10, 10), 0.0);

        let inside = canvas.pixel(5, 5).unwrap();
        assert_eq!((inside.red(), inside.blue()), (0, 255));
        let outside = canvas.pixel(4, 4).unwrap();
        assert_eq!(outside.red(), 255);
    }

    #[test]
    fn flatten_keeps_opaque_colors() {
        let mut canvas = Pixmap::new(3, 2).unwrap();
        canvas.fill(Color::from_rgba8(12, 34, 56, 255));
        let rgb = flatten_rgb(&canvas);
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(2, 1), &Rgb([12, 34, 56]));
    }
}
