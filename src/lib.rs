//! # Photo Collage
//!
//! Compose up to five photos into a styled collage and export it as a JPEG.
//! A collage is a layout preset (normalized cells), an aspect ratio, a gutter,
//! a corner radius and a background color, plus the photos that fill the
//! cells in display order.
//!
//! # Architecture: One Render Loop, Two Sizes
//!
//! The same render loop draws the interactive preview and the export:
//!
//! ```text
//! Session ──▶ compositor::render ──▶ Surface (preview, reused)
//!    │             │
//!    │             └── ImageSourceCache (decode once per image)
//!    │
//!    └──▶ export::export_jpeg ──▶ fresh Surface at export width ──▶ JPEG
//!                                                    │
//!                                    deliver: share → save to disk
//! ```
//!
//! Geometry is resolution-independent: cells are normalized, focus is a
//! fraction of the panning room, and gutter/radius are output pixels. The
//! only thing that differs between preview and export is the canvas width.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Active image set, settings, capacity enforcement, drags, render tokens |
//! | [`compositor`] | The render loop: background, per-cell cover crop, rounded clip |
//! | [`export`] | Export-resolution render, JPEG encode, share/save delivery chain |
//! | [`cache`] | Image id → decoded bitmap, with fallback decoding and eviction |
//! | [`focus`] | Per-pointer drag state machine mapping pointer deltas to focus |
//! | [`layout`] | Static layout and aspect-ratio catalogs |
//! | [`cancel`] | Cooperative cancellation token for superseded passes |
//! | [`config`] | `collage.toml` loading, validation and merging |
//! | [`types`] | Image records, settings record and its JSON form |
//! | [`imaging`] | Pure-Rust pixel work: identify, decode, resample, composite, encode |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Cover, Never Contain
//!
//! Every photo fills its cell completely. The crop window keeps the cell's
//! aspect ratio and slides across the overflowing axis according to the
//! photo's focal point, so one number per axis is all the user ever edits.
//!
//! ## Corner Radius Shrinks With the Gutter
//!
//! The drawn radius is `corner_radius - gutter / 2`, floored at zero. Cells
//! are inset by half the gutter, so this keeps the outer curve of adjacent
//! cells visually concentric as the gutter grows.
//!
//! ## Cooperative Cancellation
//!
//! Rendering is synchronous. Each pass carries a [`cancel::CancelToken`] and
//! checks it between cells and around the expensive steps; starting a new
//! pass cancels the previous token. A superseded pass stops at the next
//! check and never writes half a cell.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and JPEG encoding use the `image` crate, compositing uses
//! `tiny-skia`. No system libraries, so the binary runs anywhere.

pub mod cache;
pub mod cancel;
pub mod compositor;
pub mod config;
pub mod export;
pub mod focus;
pub mod imaging;
pub mod layout;
pub mod output;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
