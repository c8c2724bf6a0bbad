//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header only) |
//! | **Decode** | `image` decoders, bytes first then preview path |
//! | **Cover crop** | pure math in [`calculations`](self::cover_crop) |
//! | **Resample** | `image::imageops::resize` with Lanczos3 |
//! | **Rounded clip + composite** | `tiny-skia` path fill with a pattern shader |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for cover/cell/canvas geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`DecodeStrategy`] trait + mock for tests
//! - **Rust backend**: [`BytesDecoder`], [`PreviewDecoder`], JPEG encoding
//! - **Operations**: Resampling and canvas compositing

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodeStrategy, Dimensions};
pub use calculations::{
    MIN_ASPECT_RATIO, canvas_dimensions, cell_rect, clamp_corner_radius, cover_crop,
    cover_overflow, cover_scale, effective_corner_radius,
};
pub use operations::{composite_cell, flatten_rgb, resample, rounded_rect_path};
pub use params::{CropRect, PixelRect, Quality};
pub use rust_backend::{
    BytesDecoder, PreviewDecoder, default_strategies, encode_jpeg, identify, is_supported_path,
    supported_input_extensions,
};
