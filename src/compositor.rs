//! The render loop: layout + images + settings → canvas pixels.
//!
//! ```text
//! resize surface (if needed) → fill background
//!   for each cell, in layout order:
//!     image? natural size? → dest rect (gutter inset) → cover crop
//!     → resolve bitmap (cache) → resample → rounded-clip composite
//! ```
//!
//! The [`Surface`] is passed in explicitly; the session owns it and hands the
//! same surface to every preview pass. A pass draws each cell completely
//! before starting the next, so a cancelled pass leaves a canvas that is
//! partially drawn but never torn inside a cell.
//!
//! Per-cell failures (undecodable image, degenerate geometry) skip that cell
//! and the pass continues; the only hard error is failing to allocate the
//! surface itself.

use crate::cache::ImageSourceCache;
use crate::cancel::{CancelToken, Cancelled};
use crate::imaging::{
    CropRect, cell_rect, composite_cell, cover_crop, effective_corner_radius, resample,
};
use crate::layout::Layout;
use crate::types::{CollageImage, CollageSettings, ImageId, Rgb};
use thiserror::Error;
use tiny_skia::{Color, Pixmap};
use tracing::{debug, trace, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("cannot allocate a {0}x{1} rendering surface")]
    Surface(u32, u32),
}

/// Backing pixel buffer a collage is drawn into.
#[derive(Debug, Default)]
pub struct Surface {
    pixmap: Option<Pixmap>,
    allocations: u32,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the surface `width`×`height`, reallocating only on a size change.
    fn ensure_size(&mut self, width: u32, height: u32) -> Result<&mut Pixmap, RenderError> {
        let matches = self
            .pixmap
            .as_ref()
            .is_some_and(|p| p.width() == width && p.height() == height);
        if !matches {
            let pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface(width, height))?;
            self.allocations += 1;
            self.pixmap = Some(pixmap);
        }
        self.pixmap
            .as_mut()
            .ok_or(RenderError::Surface(width, height))
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    /// How many times the backing buffer has been (re)allocated.
    pub fn allocations(&self) -> u32 {
        self.allocations
    }
}

/// What happened to one cell in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Drawn(ImageId),
    /// No image for this cell.
    Empty,
    /// The image's natural size is not known yet.
    Pending(ImageId),
    /// Gutter leaves no room at this canvas size.
    Collapsed(ImageId),
    Failed(ImageId),
}

/// How a pass finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// One status per layout cell, in layout order.
    Completed(Vec<CellStatus>),
    /// Superseded before finishing; statuses for the cells handled so far.
    Cancelled(Vec<CellStatus>),
}

impl RenderOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderOutcome::Cancelled(_))
    }

    pub fn cells(&self) -> &[CellStatus] {
        match self {
            RenderOutcome::Completed(c) | RenderOutcome::Cancelled(c) => c,
        }
    }

    pub fn drawn(&self) -> usize {
        self.cells()
            .iter()
            .filter(|c| matches!(c, CellStatus::Drawn(_)))
            .count()
    }
}

/// Everything a pass reads, borrowed for its duration.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub images: &'a [CollageImage],
    pub layout: &'a Layout,
    pub settings: &'a CollageSettings,
    pub width: u32,
    pub height: u32,
}

fn background(rgb: Rgb) -> Color {
    Color::from_rgba8(rgb.0, rgb.1, rgb.2, 255)
}

/// Draw `request` onto `surface`.
#[tracing::instrument(
    skip_all,
    fields(layout = request.layout.id, width = request.width, height = request.height)
)]
pub fn render(
    surface: &mut Surface,
    cache: &mut ImageSourceCache,
    request: RenderRequest<'_>,
    token: &CancelToken,
) -> Result<RenderOutcome, RenderError> {
    let canvas = surface.ensure_size(request.width, request.height)?;
    canvas.fill(background(request.settings.background_color));

    let mut cells = Vec::with_capacity(request.layout.cells.len());
    if request.images.is_empty() {
        cells.resize(request.layout.cells.len(), CellStatus::Empty);
        return Ok(RenderOutcome::Completed(cells));
    }

    for index in 0..request.layout.cells.len() {
        match draw_cell(canvas, cache, &request, index, token) {
            Ok(status) => cells.push(status),
            Err(Cancelled) => {
                trace!(cell = index, "render superseded");
                return Ok(RenderOutcome::Cancelled(cells));
            }
        }
    }
    Ok(RenderOutcome::Completed(cells))
}

fn draw_cell(
    canvas: &mut Pixmap,
    cache: &mut ImageSourceCache,
    request: &RenderRequest<'_>,
    index: usize,
    token: &CancelToken,
) -> Result<CellStatus, Cancelled> {
    token.check()?;
    let Some(image) = request.images.get(index) else {
        return Ok(CellStatus::Empty);
    };
    let Some((natural_w, natural_h)) = image.natural_size.filter(|&(w, h)| w > 0 && h > 0) else {
        return Ok(CellStatus::Pending(image.id));
    };

    let cell = &request.layout.cells[index];
    let gutter = request.settings.gutter;
    let Some(rect) = cell_rect(cell, (request.width, request.height), gutter) else {
        debug!(cell = index, image = %image.id, "cell collapsed by gutter");
        return Ok(CellStatus::Collapsed(image.id));
    };

    let crop = cover_crop(
        (f64::from(natural_w), f64::from(natural_h)),
        (f64::from(rect.width), f64::from(rect.height)),
        image.focus(),
    );

    let bitmap = match cache.resolve(image) {
        Ok(bitmap) => bitmap,
        Err(_) => return Ok(CellStatus::Failed(image.id)),
    };
    token.check()?;
    if bitmap.width() == 0 || bitmap.height() == 0 {
        warn!(cell = index, image = %image.id, "empty bitmap");
        return Ok(CellStatus::Failed(image.id));
    }

    // The crop was computed against the natural size; map it onto the
    // bitmap in case the two differ (e.g. a downscaled external bitmap).
    let sx = f64::from(bitmap.width()) / f64::from(natural_w);
    let sy = f64::from(bitmap.height()) / f64::from(natural_h);
    let crop = CropRect {
        x: crop.x * sx,
        y: crop.y * sy,
        width: crop.width * sx,
        height: crop.height * sy,
    };

    let pixels = resample(&bitmap, crop, (rect.width, rect.height), token)?;
    token.check()?;

    let radius = effective_corner_radius(request.settings.corner_radius, gutter);
    if !composite_cell(canvas, &pixels, rect, radius) {
        warn!(cell = index, image = %image.id, "composite produced nothing");
        return Ok(CellStatus::Failed(image.id));
    }
    Ok(CellStatus::Drawn(image.id))
}
