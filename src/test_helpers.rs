//! Shared test utilities: synthetic photos in memory and on disk.
//!
//! Real photos are not checked into the repository. Tests build small
//! gradients or solid fills instead, which are enough to tell cells apart
//! and to assert which part of a source ended up where.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let session = session_with(&[solid_png(40, 30, [255, 0, 0])]);
//! assert_eq!(session.images().len(), 1);
//! ```

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

use crate::session::Session;
use crate::types::{CollageSettings, ImageSource};

// =========================================================================
// Synthetic pixels
// =========================================================================

/// Horizontal red ramp over vertical green ramp, opaque.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// PNG-encoded [`gradient_rgba`].
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&gradient_rgba(width, height))
}

/// PNG-encoded solid color.
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let [r, g, b] = rgb;
    encode_png(&RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255])))
}

fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    out.into_inner()
}

/// Write a gradient JPEG to `path`.
pub fn write_gradient_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Sessions
// =========================================================================

/// Session with default settings except for a layout and no gutter/rounding,
/// so cell contents can be probed at exact pixel positions.
pub fn flat_settings(layout_id: &str) -> CollageSettings {
    CollageSettings {
        layout_id: layout_id.to_string(),
        aspect_ratio_id: "1:1".to_string(),
        gutter: 0.0,
        corner_radius: 0.0,
        ..CollageSettings::default()
    }
}

/// New session holding one in-memory source per entry of `encoded`.
pub fn session_with(encoded: &[Vec<u8>]) -> Session {
    let mut session = Session::new(flat_settings("mosaic"));
    let sources = encoded
        .iter()
        .enumerate()
        .map(|(i, bytes)| ImageSource::from_bytes(format!("img-{i}.png"), bytes.clone()))
        .collect();
    session.add_sources(sources);
    session
}
