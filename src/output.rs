//! CLI output formatting.
//!
//! Output follows the same two-level pattern everywhere: a header line with
//! a positional index and the entity's identity, then indented context lines.
//!
//! # Output Format
//!
//! ## Layouts
//!
//! ```text
//! Layouts
//! 001 single       Single (1 photo)
//! 006 grid-2x2     Grid (4 photos)
//!
//! Aspect ratios
//! 001 1:1    Square
//! 002 4:5    Portrait 4:5
//! ```
//!
//! ## Compose
//!
//! ```text
//! Images
//! 001 beach.jpg (4032x3024)
//!     Focus: 0.50, 0.30
//! 002 dog.png (800x600)
//!
//! Rejected (collage holds 4)
//!     extra.jpg
//!
//! Unreadable
//!     notes.jpg: unsupported format
//!
//! Cells (grid-2x2)
//! 001 #1 drawn
//! 002 #2 drawn
//! 003 empty
//! 004 empty
//!
//! Exported collage-4-5.jpg (2048x2560, 812 KB)
//!     Saved: out/collage-4-5.jpg
//!     Cache: 2 decoded, 0 external, 0 hits, 0 failed
//! ```
//!
//! # Architecture
//!
//! Each block has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure, with no I/O.

use crate::cache::CacheStats;
use crate::compositor::{CellStatus, RenderOutcome};
use crate::export::{Delivered, ExportedJpeg};
use crate::layout::{ASPECT_RATIOS, LAYOUTS, Layout};
use crate::session::AddReport;
use crate::types::CollageImage;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn photo_count(n: usize) -> String {
    if n == 1 {
        "1 photo".to_string()
    } else {
        format!("{n} photos")
    }
}

/// Human-readable size: bytes below 1 KB, otherwise whole KB.
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{} KB", bytes / 1024)
    }
}

// ============================================================================
// Layouts
// ============================================================================

pub fn format_layouts() -> Vec<String> {
    let mut lines = vec!["Layouts".to_string()];
    for (i, layout) in LAYOUTS.iter().enumerate() {
        lines.push(format!(
            "{} {:<12} {} ({})",
            format_index(i + 1),
            layout.id,
            layout.name,
            photo_count(layout.capacity())
        ));
    }
    lines.push(String::new());
    lines.push("Aspect ratios".to_string());
    for (i, ratio) in ASPECT_RATIOS.iter().enumerate() {
        lines.push(format!(
            "{} {:<6} {}",
            format_index(i + 1),
            ratio.id,
            ratio.label
        ));
    }
    lines
}

pub fn print_layouts() {
    for line in format_layouts() {
        println!("{line}");
    }
}

// ============================================================================
// Compose
// ============================================================================

/// Active images plus whatever acquisition turned away.
pub fn format_add_report(images: &[CollageImage], report: &AddReport, capacity: usize) -> Vec<String> {
    let mut lines = vec!["Images".to_string()];
    for (i, image) in images.iter().enumerate() {
        let size = match image.natural_size {
            Some((w, h)) => format!(" ({w}x{h})"),
            None => String::new(),
        };
        lines.push(format!("{} {}{}", format_index(i + 1), image.source.label, size));
        let (fx, fy) = image.focus();
        if (fx, fy) != (0.5, 0.5) {
            lines.push(format!("{}Focus: {fx:.2}, {fy:.2}", indent(1)));
        }
    }

    if !report.rejected.is_empty() {
        lines.push(String::new());
        lines.push(format!("Rejected (collage holds {capacity})"));
        for label in &report.rejected {
            lines.push(format!("{}{label}", indent(1)));
        }
    }

    if !report.failed.is_empty() {
        lines.push(String::new());
        lines.push("Unreadable".to_string());
        for (label, reason) in &report.failed {
            lines.push(format!("{}{label}: {reason}", indent(1)));
        }
    }
    lines
}

pub fn print_add_report(images: &[CollageImage], report: &AddReport, capacity: usize) {
    for line in format_add_report(images, report, capacity) {
        println!("{line}");
    }
}

fn cell_line(index: usize, status: &CellStatus) -> String {
    let detail = match status {
        CellStatus::Drawn(id) => format!("{id} drawn"),
        CellStatus::Empty => "empty".to_string(),
        CellStatus::Pending(id) => format!("{id} pending (size unknown)"),
        CellStatus::Collapsed(id) => format!("{id} skipped (no room inside gutter)"),
        CellStatus::Failed(id) => format!("{id} skipped (could not decode)"),
    };
    format!("{} {detail}", format_index(index + 1))
}

pub fn format_render_outcome(layout: &Layout, outcome: &RenderOutcome) -> Vec<String> {
    let mut lines = vec![format!("Cells ({})", layout.id)];
    lines.extend(
        outcome
            .cells()
            .iter()
            .enumerate()
            .map(|(i, status)| cell_line(i, status)),
    );
    if outcome.is_cancelled() {
        lines.push(format!("{}(render cancelled)", indent(1)));
    }
    lines
}

pub fn print_render_outcome(layout: &Layout, outcome: &RenderOutcome) {
    for line in format_render_outcome(layout, outcome) {
        println!("{line}");
    }
}

pub fn format_export(file: &ExportedJpeg, delivered: &Delivered, stats: &CacheStats) -> Vec<String> {
    let destination = match delivered {
        Delivered::Shared => "Shared".to_string(),
        Delivered::Saved(path) => format!("Saved: {}", path.display()),
    };
    vec![
        format!(
            "Exported {} ({}x{}, {})",
            file.filename,
            file.width,
            file.height,
            format_size(file.bytes.len())
        ),
        format!("{}{destination}", indent(1)),
        format!("{}Cache: {stats}", indent(1)),
    ]
}

pub fn print_export(file: &ExportedJpeg, delivered: &Delivered, stats: &CacheStats) {
    for line in format_export(file, delivered, stats) {
        println!("{line}");
    }
}
