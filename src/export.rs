//! JPEG export and delivery.
//!
//! Export re-runs the render loop at the canonical export width on a fresh
//! surface, independent of whatever size the preview last used, then encodes
//! the canvas to JPEG.
//!
//! ## Delivery
//!
//! The encoded file is handed to an ordered list of [`DeliveryTarget`]s;
//! the first one that accepts and succeeds wins. The usual chain is
//!
//! ```text
//! share (if available and it accepts the file) → save to disk
//! ```
//!
//! [`SaveToDisk`] is the terminal fallback: it never declines, and if the
//! share step is unsupported, rejected, cancelled or fails, the file is saved
//! instead. Share problems are logged, never returned.

use crate::cache::ImageSourceCache;
use crate::cancel::CancelToken;
use crate::compositor::{RenderError, RenderOutcome, RenderRequest, Surface, render};
use crate::imaging::{BackendError, Quality, canvas_dimensions, encode_jpeg, flatten_rgb};
use crate::layout::{aspect_ratio_or_default, layout_or_default};
use crate::types::{CollageImage, CollageSettings};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Canonical export width in pixels.
pub const EXPORT_WIDTH: u32 = 2048;

pub const JPEG_MIME: &str = "image/jpeg";
pub const SHARE_TITLE: &str = "Photo collage";
pub const SHARE_TEXT: &str = "A photo collage made from my pictures.";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("export render was cancelled")]
    Cancelled,
    #[error("JPEG encode failed: {0}")]
    Encode(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Export size and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    pub width: u32,
    pub quality: Quality,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: EXPORT_WIDTH,
            quality: Quality::default(),
        }
    }
}

/// An encoded collage, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedJpeg {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl ExportedJpeg {
    pub fn mime(&self) -> &'static str {
        JPEG_MIME
    }
}

/// Suggested download name: `collage-<aspect id>.jpg` with `:` → `-`.
///
/// ```
/// # use photo_collage::export::export_filename;
/// assert_eq!(export_filename("4:5"), "collage-4-5.jpg");
/// ```
pub fn export_filename(aspect_ratio_id: &str) -> String {
    format!("collage-{}.jpg", aspect_ratio_id.replace(':', "-"))
}

/// Render at export resolution and encode.
///
/// A cancelled `token` aborts before encoding with [`ExportError::Cancelled`].
#[tracing::instrument(skip_all, fields(layout = %settings.layout_id, aspect = %settings.aspect_ratio_id))]
pub fn export_jpeg(
    images: &[CollageImage],
    settings: &CollageSettings,
    cache: &mut ImageSourceCache,
    config: ExportConfig,
    token: &CancelToken,
) -> Result<ExportedJpeg, ExportError> {
    let aspect = aspect_ratio_or_default(&settings.aspect_ratio_id);
    let (width, height) = canvas_dimensions(config.width, aspect.value);

    let mut surface = Surface::new();
    let outcome = render(
        &mut surface,
        cache,
        RenderRequest {
            images,
            layout: layout_or_default(&settings.layout_id),
            settings,
            width,
            height,
        },
        token,
    )?;
    if let RenderOutcome::Cancelled(_) = outcome {
        return Err(ExportError::Cancelled);
    }

    let pixmap = surface
        .pixmap()
        .ok_or(RenderError::Surface(width, height))?;
    let bytes = encode_jpeg(&flatten_rgb(pixmap), config.quality)?;
    info!(width, height, bytes = bytes.len(), drawn = outcome.drawn(), "exported");
    Ok(ExportedJpeg {
        bytes,
        filename: export_filename(aspect.id),
        width,
        height,
    })
}

// ============================================================================
// Delivery
// ============================================================================

/// Why a share did not happen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("sharing is not available here")]
    Unsupported,
    #[error("share target rejected the file: {0}")]
    Rejected(String),
    #[error("share was cancelled")]
    Cancelled,
    #[error("share failed: {0}")]
    Failed(String),
}

/// Payload for a platform share sheet.
#[derive(Debug, Clone, Copy)]
pub struct SharePayload<'a> {
    pub file: &'a ExportedJpeg,
    pub title: &'static str,
    pub text: &'static str,
}

/// Platform share capability. Implemented outside the engine.
pub trait ShareTarget {
    /// Whether this file (type and size) can be shared right now.
    fn can_share(&self, file: &ExportedJpeg) -> bool;

    fn share(&self, payload: SharePayload<'_>) -> Result<(), ShareError>;
}

/// Where a delivered file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Shared,
    Saved(PathBuf),
}

/// One step of the delivery chain.
pub trait DeliveryTarget {
    fn name(&self) -> &'static str;

    /// `Ok(None)` declines and passes the file to the next target.
    fn deliver(&self, file: &ExportedJpeg) -> Result<Option<Delivered>, ExportError>;
}

/// Offers the file to a [`ShareTarget`]; declines on any share problem.
pub struct Share<S>(pub S);

impl<S: ShareTarget> DeliveryTarget for Share<S> {
    fn name(&self) -> &'static str {
        "share"
    }

    fn deliver(&self, file: &ExportedJpeg) -> Result<Option<Delivered>, ExportError> {
        if !self.0.can_share(file) {
            debug!(file = %file.filename, "share unavailable for this file");
            return Ok(None);
        }
        let payload = SharePayload {
            file,
            title: SHARE_TITLE,
            text: SHARE_TEXT,
        };
        match self.0.share(payload) {
            Ok(()) => Ok(Some(Delivered::Shared)),
            Err(ShareError::Cancelled) => {
                debug!(file = %file.filename, "share cancelled, falling back");
                Ok(None)
            }
            Err(e) => {
                warn!(file = %file.filename, error = %e, "share did not complete");
                Ok(None)
            }
        }
    }
}

/// Writes the file into a directory. Always accepts.
pub struct SaveToDisk {
    pub dir: PathBuf,
}

impl SaveToDisk {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeliveryTarget for SaveToDisk {
    fn name(&self) -> &'static str {
        "save"
    }

    fn deliver(&self, file: &ExportedJpeg) -> Result<Option<Delivered>, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file.filename);
        std::fs::write(&path, &file.bytes)?;
        Ok(Some(Delivered::Saved(path)))
    }
}

/// Run `targets` in order, stopping at the first that delivers, and fall
/// back to saving into `fallback_dir` if all decline.
pub fn deliver(
    file: &ExportedJpeg,
    targets: &[&dyn DeliveryTarget],
    fallback_dir: &Path,
) -> Result<Delivered, ExportError> {
    for target in targets {
        if let Some(done) = target.deliver(file)? {
            debug!(target = target.name(), "delivered");
            return Ok(done);
        }
    }
    SaveToDisk::new(fallback_dir)
        .deliver(file)?
        .ok_or_else(|| ExportError::Io(std::io::Error::other("save declined")))
}
