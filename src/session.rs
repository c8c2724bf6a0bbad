//! One collage-editing session.
//!
//! The [`Session`] owns everything scoped to a single collage: the active
//! image list, the settings record, the preview [`Surface`], the
//! [`ImageSourceCache`] and the [`FocusController`]. UI and CLI code talk to
//! the engine only through it.
//!
//! ## Invariants
//!
//! - `images.len() <= layout.capacity()` after every operation. Adding past
//!   capacity rejects the extra sources; switching to a smaller layout drops
//!   trailing images (positional truncation, display order kept).
//! - Every change to the active set is followed by
//!   [`ImageSourceCache::retain_active`], so no decoded bitmap outlives its
//!   image.
//! - At most one preview pass is current: [`Session::begin_render`] cancels
//!   the previous token before issuing a new one.
//!
//! ## Acquisition
//!
//! [`Session::add_sources`] probes natural sizes from image headers in
//! parallel with rayon. Sources that cannot be identified are reported as
//! decode failures and never enter the active set.

use crate::cache::{CacheStats, Eviction, ImageSourceCache};
use crate::cancel::CancelToken;
use crate::compositor::{RenderError, RenderOutcome, RenderRequest, Surface, render};
use crate::export::{ExportConfig, ExportError, ExportedJpeg, export_jpeg};
use crate::focus::{Drag, FocusController, FocusUpdate, PointerId};
use crate::imaging::{canvas_dimensions, cell_rect, identify};
use crate::layout::{Layout, aspect_ratio_or_default, layout_or_default};
use crate::types::{CollageImage, CollageSettings, ImageId, ImageSource, SettingsPatch};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Result of [`Session::add_sources`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddReport {
    /// Ids of newly added images, in display order.
    pub added: Vec<ImageId>,
    /// Labels of sources dropped because the collage was full.
    pub rejected: Vec<String>,
    /// `(label, reason)` for sources that could not be identified.
    pub failed: Vec<(String, String)>,
}

pub struct Session {
    settings: CollageSettings,
    images: Vec<CollageImage>,
    next_id: u64,
    cache: ImageSourceCache,
    surface: Surface,
    focus: FocusController,
    in_flight: Option<CancelToken>,
    /// Canvas size of the last preview pass; drags measure cells against it.
    preview_size: Option<(u32, u32)>,
}

impl Session {
    pub fn new(settings: CollageSettings) -> Self {
        Self::with_cache(settings, ImageSourceCache::new())
    }

    pub fn with_cache(settings: CollageSettings, cache: ImageSourceCache) -> Self {
        // Route through merge so ids and lengths are validated.
        let settings = CollageSettings::default().merged(&settings.into());
        Self {
            settings,
            images: Vec::new(),
            next_id: 1,
            cache,
            surface: Surface::new(),
            focus: FocusController::new(),
            in_flight: None,
            preview_size: None,
        }
    }

    pub fn settings(&self) -> &CollageSettings {
        &self.settings
    }

    pub fn images(&self) -> &[CollageImage] {
        &self.images
    }

    pub fn image(&self, id: ImageId) -> Option<&CollageImage> {
        self.images.iter().find(|i| i.id == id)
    }

    pub fn layout(&self) -> &'static Layout {
        layout_or_default(&self.settings.layout_id)
    }

    /// How many images the current layout can hold.
    pub fn capacity(&self) -> usize {
        self.layout().capacity()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_images(&self) -> usize {
        self.cache.len()
    }

    // ------------------------------------------------------------------
    // Active set
    // ------------------------------------------------------------------

    /// Add sources in order until the collage is full.
    pub fn add_sources(&mut self, sources: Vec<ImageSource>) -> AddReport {
        let probed: Vec<Result<ImageSource, (String, String)>> = sources
            .into_par_iter()
            .map(|mut source| {
                if source.natural_size.is_none() {
                    match identify(&source) {
                        Ok(dims) => source.natural_size = Some((dims.width, dims.height)),
                        Err(e) => return Err((source.label.clone(), e.to_string())),
                    }
                }
                match source.natural_size {
                    Some((w, h)) if w > 0 && h > 0 => Ok(source),
                    _ => Err((source.label.clone(), "image has no pixels".to_string())),
                }
            })
            .collect();

        let mut report = AddReport::default();
        for result in probed {
            match result {
                Ok(source) if self.images.len() < self.capacity() => {
                    let id = ImageId(self.next_id);
                    self.next_id += 1;
                    debug!(image = %id, label = %source.label, "added");
                    self.images.push(CollageImage::new(id, source));
                    report.added.push(id);
                }
                Ok(source) => {
                    debug!(label = %source.label, capacity = self.capacity(), "collage full");
                    report.rejected.push(source.label);
                }
                Err((label, reason)) => {
                    warn!(%label, %reason, "could not read image");
                    report.failed.push((label, reason));
                }
            }
        }
        self.sync_cache();
        report
    }

    /// Remove an image. Returns `false` if it was not in the collage.
    pub fn remove(&mut self, id: ImageId) -> bool {
        let before = self.images.len();
        self.images.retain(|i| i.id != id);
        if self.images.len() == before {
            return false;
        }
        self.focus.forget_image(id);
        self.sync_cache();
        true
    }

    /// Move an image to `index` (clamped to the end). Cells follow display
    /// order, so this changes which cell the image lands in.
    pub fn move_image(&mut self, id: ImageId, index: usize) -> bool {
        let Some(from) = self.images.iter().position(|i| i.id == id) else {
            return false;
        };
        let image = self.images.remove(from);
        let to = index.min(self.images.len());
        self.images.insert(to, image);
        true
    }

    /// Replace-merge new settings. A layout with less room evicts trailing
    /// images; their evictions are returned.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Vec<Eviction> {
        let merged = self.settings.merged(patch);
        let geometry_changed = merged.layout_id != self.settings.layout_id
            || merged.aspect_ratio_id != self.settings.aspect_ratio_id
            || merged.gutter != self.settings.gutter;
        if geometry_changed {
            // Cell sizes from the last preview no longer apply.
            self.preview_size = None;
        }
        self.settings = merged;
        let capacity = self.capacity();
        if self.images.len() <= capacity {
            return Vec::new();
        }
        for dropped in self.images.drain(capacity..) {
            self.focus.forget_image(dropped.id);
        }
        let evicted = self.sync_cache();
        info!(
            layout = %self.settings.layout_id,
            capacity,
            evicted = evicted.len(),
            "layout shrank"
        );
        evicted
    }

    fn sync_cache(&mut self) -> Vec<Eviction> {
        let active: Vec<ImageId> = self.images.iter().map(|i| i.id).collect();
        self.cache.retain_active(&active)
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    /// Set an image's focal point (clamped). Returns `false` for unknown ids.
    pub fn set_focus(&mut self, id: ImageId, x: f64, y: f64) -> bool {
        match self.images.iter_mut().find(|i| i.id == id) {
            Some(image) => {
                image.set_focus(x, y);
                true
            }
            None => false,
        }
    }

    pub fn reset_focus(&mut self, id: ImageId) -> bool {
        self.set_focus(id, 0.5, 0.5)
    }

    /// Topmost populated cell under `position` (preview pixels).
    ///
    /// Later cells draw over earlier ones, so overlapping layouts resolve to
    /// the highest index.
    pub fn hit_test(&self, position: (f64, f64)) -> Option<(usize, ImageId)> {
        let (w, h) = self.preview_size?;
        let (nx, ny) = (position.0 / f64::from(w), position.1 / f64::from(h));
        let layout = self.layout();
        layout
            .cells
            .iter()
            .zip(&self.images)
            .enumerate()
            .rev()
            .find(|(_, (cell, _))| cell.contains(nx, ny))
            .map(|(index, (_, image))| (index, image.id))
    }

    /// Start panning the image under `position`. Needs a preview pass since
    /// the last layout, aspect or gutter change, because cell sizes are
    /// measured on the preview canvas.
    pub fn begin_drag(&mut self, pointer: PointerId, position: (f64, f64)) -> bool {
        let Some(preview) = self.preview_size else {
            return false;
        };
        let Some((index, id)) = self.hit_test(position) else {
            return false;
        };
        let Some(image) = self.image(id) else {
            return false;
        };
        let Some((nw, nh)) = image.natural_size else {
            return false;
        };
        let Some(rect) = cell_rect(&self.layout().cells[index], preview, self.settings.gutter)
        else {
            return false;
        };
        let drag = Drag {
            image: id,
            start_pointer: position,
            start_focus: image.focus(),
            cell_size: (f64::from(rect.width), f64::from(rect.height)),
            natural_size: (f64::from(nw), f64::from(nh)),
        };
        self.focus.begin(pointer, drag)
    }

    /// Apply a pointer move to its drag, writing the new focus immediately.
    pub fn drag_to(&mut self, pointer: PointerId, position: (f64, f64)) -> Option<FocusUpdate> {
        let update = self.focus.drag_to(pointer, position)?;
        self.set_focus(update.image, update.focus.0, update.focus.1)
            .then_some(update)
    }

    pub fn end_drag(&mut self, pointer: PointerId) -> bool {
        self.focus.end(pointer).is_some()
    }

    pub fn cancel_drag(&mut self, pointer: PointerId) -> bool {
        self.focus.cancel(pointer).is_some()
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Cancel the current pass (if any) and issue a token for a new one.
    pub fn begin_render(&mut self) -> CancelToken {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        let token = CancelToken::new();
        self.in_flight = Some(token.clone());
        token
    }

    /// Preview canvas size for a given width.
    pub fn preview_dimensions(&self, width: u32) -> (u32, u32) {
        canvas_dimensions(width, aspect_ratio_or_default(&self.settings.aspect_ratio_id).value)
    }

    /// Render the preview at `width` (height from the aspect ratio).
    pub fn render_preview(&mut self, width: u32) -> Result<RenderOutcome, RenderError> {
        let token = self.begin_render();
        self.render_with(width, &token)
    }

    /// Render the preview under an externally held token.
    pub fn render_with(
        &mut self,
        width: u32,
        token: &CancelToken,
    ) -> Result<RenderOutcome, RenderError> {
        let (width, height) = self.preview_dimensions(width);
        let layout = layout_or_default(&self.settings.layout_id);
        let outcome = render(
            &mut self.surface,
            &mut self.cache,
            RenderRequest {
                images: &self.images,
                layout,
                settings: &self.settings,
                width,
                height,
            },
            token,
        )?;
        self.preview_size = Some((width, height));
        Ok(outcome)
    }

    /// Render at export resolution and encode as JPEG. Supersedes any
    /// in-flight preview pass.
    pub fn export(&mut self, config: ExportConfig) -> Result<ExportedJpeg, ExportError> {
        let token = self.begin_render();
        self.export_with(config, &token)
    }

    /// Export under an externally held token; cancelling it abandons the
    /// export before encoding.
    pub fn export_with(
        &mut self,
        config: ExportConfig,
        token: &CancelToken,
    ) -> Result<ExportedJpeg, ExportError> {
        export_jpeg(&self.images, &self.settings, &mut self.cache, config, token)
    }

    /// End the session, releasing every cached bitmap.
    pub fn close(mut self) -> Vec<Eviction> {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.images.clear();
        self.cache.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::CellStatus;
    use crate::layout::MAX_IMAGES;
    use crate::test_helpers::{flat_settings, gradient_png, session_with, solid_png};
    use std::sync::Arc;

    fn pngs(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| solid_png(40, 30, [i as u8 * 40, 0, 0])).collect()
    }

    fn ids(session: &Session) -> Vec<ImageId> {
        session.images().iter().map(|i| i.id).collect()
    }

    fn switch_layout(session: &mut Session, id: &str) -> Vec<Eviction> {
        session.update_settings(&SettingsPatch {
            layout_id: Some(id.into()),
            ..SettingsPatch::default()
        })
    }

    #[test]
    fn add_probes_natural_size() {
        let session = session_with(&[gradient_png(64, 48)]);
        assert_eq!(session.images()[0].natural_size, Some((64, 48)));
        assert_eq!(session.images()[0].focus(), (0.5, 0.5));
    }

    #[test]
    fn add_rejects_beyond_capacity() {
        let mut session = Session::new(flat_settings("split-v"));
        let sources = pngs(4)
            .into_iter()
            .enumerate()
            .map(|(i, b)| ImageSource::from_bytes(format!("{i}.png"), b))
            .collect();

        let report = session.add_sources(sources);

        assert_eq!(report.added, vec![ImageId(1), ImageId(2)]);
        assert_eq!(report.rejected, vec!["2.png", "3.png"]);
        assert_eq!(session.images().len(), 2);
    }

    #[test]
    fn add_reports_undecodable_sources() {
        let mut session = Session::new(flat_settings("mosaic"));
        let report = session.add_sources(vec![
            ImageSource::from_bytes("ok.png", solid_png(4, 4, [1, 2, 3])),
            ImageSource::from_bytes("bad.jpg", b"nope".to_vec()),
        ]);
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad.jpg");
    }

    #[test]
    fn corrupt_bytes_with_readable_preview_are_accepted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("p.png");
        std::fs::write(&path, solid_png(40, 30, [0, 0, 255])).unwrap();
        let mut source = ImageSource::from_path(&path);
        source.bytes = Some(Arc::from(&b"corrupt"[..]));
        let mut session = Session::new(flat_settings("single"));

        let report = session.add_sources(vec![source]);

        assert_eq!(report.added, vec![ImageId(1)]);
        assert!(report.failed.is_empty());
        assert_eq!(session.images()[0].natural_size, Some((40, 30)));
        let outcome = session.render_preview(40).unwrap();
        assert_eq!(outcome.cells(), &[CellStatus::Drawn(ImageId(1))]);
    }

    #[test]
    fn ids_stay_unique_after_removal() {
        let mut session = session_with(&pngs(2));
        assert!(session.remove(ImageId(1)));
        session.add_sources(vec![ImageSource::from_bytes("n.png", pngs(1).remove(0))]);
        assert_eq!(ids(&session), vec![ImageId(2), ImageId(3)]);
        assert!(!session.remove(ImageId(1)));
    }

    #[test]
    fn layout_downgrade_keeps_first_two_and_releases_rest() {
        let mut session = session_with(&pngs(5));
        session.render_preview(100).unwrap();
        assert_eq!(session.cached_images(), 5);

        let evicted = switch_layout(&mut session, "split-h");

        assert_eq!(ids(&session), vec![ImageId(1), ImageId(2)]);
        assert_eq!(evicted.len(), 3);
        assert!(evicted.iter().all(|e| e.released));
        assert_eq!(
            evicted.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![ImageId(3), ImageId(4), ImageId(5)]
        );
        assert_eq!(session.cached_images(), 2);
        assert_eq!(session.cache_stats().released, 3);
    }

    #[test]
    fn capacity_invariant_over_operation_sequence() {
        let mut session = session_with(&pngs(3));
        let layouts = ["single", "mosaic", "triptych", "split-v", "grid-2x2", "overlap"];
        for (step, layout) in layouts.iter().cycle().take(24).enumerate() {
            switch_layout(&mut session, layout);
            if step % 3 == 0 {
                session.add_sources(
                    pngs(3)
                        .into_iter()
                        .map(|b| ImageSource::from_bytes("x.png", b))
                        .collect(),
                );
            }
            if step % 4 == 1
                && let Some(first) = session.images().first().map(|i| i.id)
            {
                session.remove(first);
            }
            let cap = session.capacity();
            assert!(session.images().len() <= cap.min(MAX_IMAGES));
            assert!(session.cached_images() <= session.images().len());
        }
    }

    #[test]
    fn settings_merge_keeps_untouched_fields() {
        let mut session = Session::new(CollageSettings::default());
        session.update_settings(&SettingsPatch {
            gutter: Some(4.0),
            ..SettingsPatch::default()
        });
        assert_eq!(session.settings().gutter, 4.0);
        assert_eq!(session.settings().corner_radius, 24.0);
    }

    #[test]
    fn invalid_initial_settings_fall_back() {
        let mut settings = CollageSettings::default();
        settings.layout_id = "nope".into();
        settings.gutter = -1.0;
        let session = Session::new(settings);
        assert_eq!(session.layout().id, "grid-2x2");
        assert_eq!(session.settings().gutter, 16.0);
    }

    #[test]
    fn set_focus_clamps_and_rejects_unknown_ids() {
        let mut session = session_with(&pngs(1));
        assert!(session.set_focus(ImageId(1), 2.0, -1.0));
        assert_eq!(session.image(ImageId(1)).unwrap().focus(), (1.0, 0.0));
        assert!(session.reset_focus(ImageId(1)));
        assert_eq!(session.image(ImageId(1)).unwrap().focus(), (0.5, 0.5));
        assert!(!session.set_focus(ImageId(99), 0.0, 0.0));
    }

    #[test]
    fn move_image_reorders_cells() {
        let mut session = session_with(&pngs(3));
        assert!(session.move_image(ImageId(3), 0));
        assert_eq!(ids(&session), vec![ImageId(3), ImageId(1), ImageId(2)]);
        assert!(session.move_image(ImageId(3), 99));
        assert_eq!(ids(&session), vec![ImageId(1), ImageId(2), ImageId(3)]);
        assert!(!session.move_image(ImageId(42), 0));
    }

    #[test]
    fn new_render_cancels_previous() {
        let mut session = session_with(&pngs(1));
        let first = session.begin_render();
        let second = session.begin_render();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        let outcome = session.render_with(50, &first).unwrap();
        assert!(outcome.is_cancelled());
        let outcome = session.render_with(50, &second).unwrap();
        assert_eq!(outcome.cells()[0], CellStatus::Drawn(ImageId(1)));
    }

    #[test]
    fn hit_test_prefers_topmost_cell() {
        let mut session = Session::new(flat_settings("overlap"));
        session.add_sources(
            pngs(2)
                .into_iter()
                .map(|b| ImageSource::from_bytes("o.png", b))
                .collect(),
        );
        assert_eq!(session.hit_test((10.0, 10.0)), None, "no preview yet");

        session.render_preview(100).unwrap();

        assert_eq!(session.hit_test((10.0, 10.0)), Some((0, ImageId(1))));
        assert_eq!(session.hit_test((70.0, 70.0)), Some((1, ImageId(2))));
    }

    #[test]
    fn drag_pans_wide_image() {
        // 200x50 image in a 100x100 single cell: scale 2 → 400 wide, 300 overflow
        let mut session = Session::new(flat_settings("single"));
        session.add_sources(vec![ImageSource::from_bytes("w.png", gradient_png(200, 50))]);
        session.render_preview(100).unwrap();

        assert!(session.begin_drag(1, (50.0, 50.0)));
        let update = session.drag_to(1, (80.0, 10.0)).unwrap();

        assert!((update.focus.0 - 0.6).abs() < 1e-9);
        assert_eq!(update.focus.1, 0.5);
        assert_eq!(session.image(ImageId(1)).unwrap().focus(), update.focus);
        assert!(session.end_drag(1));
        assert!(session.drag_to(1, (0.0, 0.0)).is_none());
    }

    #[test]
    fn drag_on_matching_aspect_keeps_focus() {
        let mut session = Session::new(flat_settings("single"));
        session.add_sources(vec![ImageSource::from_bytes("sq.png", gradient_png(300, 300))]);
        session.render_preview(100).unwrap();

        assert!(session.begin_drag(9, (50.0, 50.0)));
        for pos in [(0.0, 0.0), (100.0, 100.0), (-500.0, 900.0)] {
            let update = session.drag_to(9, pos).unwrap();
            assert_eq!(update.focus, (0.5, 0.5));
        }
        assert!(session.cancel_drag(9));
        assert_eq!(session.image(ImageId(1)).unwrap().focus(), (0.5, 0.5));
    }

    #[test]
    fn drag_requires_populated_cell() {
        let mut session = Session::new(flat_settings("split-v"));
        session.add_sources(vec![ImageSource::from_bytes("a.png", gradient_png(10, 10))]);
        session.render_preview(100).unwrap();
        assert!(!session.begin_drag(1, (75.0, 50.0)));
        assert!(session.begin_drag(1, (25.0, 50.0)));
    }

    #[test]
    fn geometry_change_requires_a_fresh_preview_before_dragging() {
        let mut session = Session::new(flat_settings("single"));
        session.add_sources(vec![ImageSource::from_bytes("w.png", gradient_png(200, 100))]);
        session.render_preview(100).unwrap();

        session.update_settings(&SettingsPatch {
            background_color: Some(crate::types::Rgb(1, 2, 3)),
            ..SettingsPatch::default()
        });
        assert!(session.hit_test((50.0, 50.0)).is_some());

        session.update_settings(&SettingsPatch {
            gutter: Some(40.0),
            ..SettingsPatch::default()
        });
        assert!(!session.begin_drag(1, (50.0, 50.0)));
        assert_eq!(session.hit_test((50.0, 50.0)), None);

        // re-measured against the new gutter: cell is 60px, overflow 60px
        session.render_preview(100).unwrap();
        assert!(session.begin_drag(1, (50.0, 50.0)));
        let update = session.drag_to(1, (80.0, 50.0)).unwrap();
        assert_eq!(update.focus, (1.0, 0.5));
    }

    #[test]
    fn export_under_cancelled_token_fails() {
        let mut session = session_with(&pngs(1));
        let token = CancelToken::new();
        token.cancel();

        let result = session.export_with(ExportConfig::default(), &token);

        assert!(matches!(result, Err(ExportError::Cancelled)));
    }

    #[test]
    fn removing_dragged_image_ends_drag() {
        let mut session = Session::new(flat_settings("single"));
        session.add_sources(vec![ImageSource::from_bytes("w.png", gradient_png(200, 50))]);
        session.render_preview(100).unwrap();
        session.begin_drag(1, (50.0, 50.0));

        session.remove(ImageId(1));

        assert!(session.drag_to(1, (10.0, 10.0)).is_none());
    }

    #[test]
    fn external_bitmaps_are_not_released_by_session() {
        let bitmap = Arc::new(image::RgbaImage::new(20, 20));
        let mut session = Session::new(flat_settings("split-v"));
        session.add_sources(vec![
            ImageSource::default().with_bitmap(Arc::clone(&bitmap)),
            ImageSource::from_bytes("b.png", solid_png(20, 20, [0, 0, 0])),
        ]);
        session.render_preview(40).unwrap();

        let evicted = session.close();

        assert_eq!(evicted.len(), 2);
        assert!(!evicted[0].released);
        assert!(evicted[1].released);
        assert_eq!(Arc::strong_count(&bitmap), 1);
    }

    #[test]
    fn export_is_independent_of_preview_size() {
        let mut session = session_with(&pngs(2));
        session.render_preview(120).unwrap();

        let file = session
            .export(ExportConfig {
                width: 200,
                ..ExportConfig::default()
            })
            .unwrap();

        assert_eq!((file.width, file.height), (200, 200));
        assert_eq!(session.surface().dimensions(), Some((120, 120)));
    }
}
