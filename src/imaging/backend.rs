//! Decode strategy trait and shared types.
//!
//! A [`DecodeStrategy`] turns an [`ImageSource`] into an RGBA bitmap. The
//! source cache holds an ordered list of strategies and takes the first one
//! that succeeds; see [`ImageSourceCache`](crate::cache::ImageSourceCache).
//!
//! The production strategies live in
//! [`rust_backend`](super::rust_backend) — pure Rust, statically linked.

use crate::types::ImageSource;
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source has no {0}")]
    MissingInput(&'static str),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// One way of decoding an image source into pixels.
///
/// Strategies must not panic on malformed input; anything undecodable is a
/// [`BackendError`], and the caller moves on to the next strategy.
pub trait DecodeStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decode the full image.
    fn decode(&self, source: &ImageSource) -> Result<RgbaImage, BackendError>;
}
