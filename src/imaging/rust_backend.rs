//! Pure Rust decode/encode backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (header only) | `ImageReader::with_guessed_format` + `into_dimensions` |
//! | Decode from file bytes | [`BytesDecoder`] — `ImageReader` over an in-memory cursor |
//! | Decode from preview path | [`PreviewDecoder`] — `ImageReader::open` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, DecodeStrategy, Dimensions};
use super::params::Quality;
use crate::types::ImageSource;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| e.eq_ignore_ascii_case(s))
        })
}

/// Read an image's natural size from its header without decoding pixels.
///
/// Tries the file bytes, then the preview path, in the same order as
/// decoding. The first header that parses wins; if none does, the last
/// error is returned.
pub fn identify(source: &ImageSource) -> Result<Dimensions, BackendError> {
    let mut last = BackendError::MissingInput("bytes or preview path");
    if let Some(bytes) = &source.bytes {
        match probe_dimensions(ImageReader::new(Cursor::new(&bytes[..])), &source.label) {
            Ok(dims) => return Ok(dims),
            Err(e) => {
                debug!(label = %source.label, error = %e, "header unreadable from bytes");
                last = e;
            }
        }
    }
    if let Some(path) = &source.preview_path {
        match ImageReader::open(path)
            .map_err(BackendError::from)
            .and_then(|reader| probe_dimensions(reader, &source.label))
        {
            Ok(dims) => return Ok(dims),
            Err(e) => last = e,
        }
    }
    Err(last)
}

fn probe_dimensions<R: BufRead + Seek>(
    reader: ImageReader<R>,
    label: &str,
) -> Result<Dimensions, BackendError> {
    let (width, height) = reader
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions of {label}: {e}"))
        })?;
    Ok(Dimensions { width, height })
}

/// Decodes the original file bytes. Format is sniffed from the content, not
/// the file name.
#[derive(Debug, Default)]
pub struct BytesDecoder;

impl DecodeStrategy for BytesDecoder {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn decode(&self, source: &ImageSource) -> Result<RgbaImage, BackendError> {
        let bytes = source
            .bytes
            .as_ref()
            .ok_or(BackendError::MissingInput("file bytes"))?;
        let img = ImageReader::new(Cursor::new(&bytes[..]))
            .with_guessed_format()?
            .decode()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to decode {}: {e}", source.label))
            })?;
        Ok(img.into_rgba8())
    }
}

/// Decodes from the preview location on disk.
#[derive(Debug, Default)]
pub struct PreviewDecoder;

impl DecodeStrategy for PreviewDecoder {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn decode(&self, source: &ImageSource) -> Result<RgbaImage, BackendError> {
        let path = source
            .preview_path
            .as_ref()
            .ok_or(BackendError::MissingInput("preview path"))?;
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to decode {}: {e}", path.display()))
            })?;
        Ok(img.into_rgba8())
    }
}

/// Production decode order: file bytes first, preview location as fallback.
pub fn default_strategies() -> Vec<Box<dyn DecodeStrategy>> {
    vec![Box::new(BytesDecoder), Box::new(PreviewDecoder)]
}

/// Encode an RGB buffer as baseline JPEG.
pub fn encode_jpeg(img: &RgbImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.value() as u8)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}
