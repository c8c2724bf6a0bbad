//! Focal-point dragging.
//!
//! Panning a photo inside its cell moves the image's focal point, which the
//! cover crop uses to place its window (see
//! [`cover_crop`](crate::imaging::cover_crop)). Each pointer runs its own
//! small state machine:
//!
//! ```text
//!   idle ──begin──▶ dragging ──release/cancel──▶ ended
//!                     │  ▲
//!                     └──┘ move → FocusUpdate
//! ```
//!
//! A drag snapshots everything it needs when it starts (start position,
//! start focus, cell size on screen, image natural size), so later moves do
//! not depend on any other state. Focus is written live on every move, so
//! ending a drag has nothing to commit.
//!
//! Per axis, the pointer delta is divided by the *overflow*, meaning how far the
//! cover-scaled image sticks out of the cell. Dragging across the full
//! overflow sweeps the focus from 0 to 1. An axis without overflow has no
//! panning room and keeps its focus.

use crate::imaging::cover_overflow;
use crate::types::{ImageId, clamp_unit};
use std::collections::HashMap;

/// Identifier of a pointer (mouse, pen, or one touch contact).
pub type PointerId = u64;

/// Snapshot taken when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub image: ImageId,
    pub start_pointer: (f64, f64),
    pub start_focus: (f64, f64),
    /// Cell size on screen, in pixels.
    pub cell_size: (f64, f64),
    pub natural_size: (f64, f64),
}

impl Drag {
    /// Focus for the pointer at `pointer`.
    pub fn focus_at(&self, pointer: (f64, f64)) -> (f64, f64) {
        let (overflow_x, overflow_y) = cover_overflow(self.natural_size, self.cell_size);
        let axis = |start: f64, delta: f64, overflow: f64| {
            if overflow > 0.0 {
                clamp_unit(start + delta / overflow)
            } else {
                start
            }
        };
        (
            axis(
                self.start_focus.0,
                pointer.0 - self.start_pointer.0,
                overflow_x,
            ),
            axis(
                self.start_focus.1,
                pointer.1 - self.start_pointer.1,
                overflow_y,
            ),
        )
    }
}

/// Where a pointer is in its drag lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPhase {
    Idle,
    Dragging(Drag),
    /// Released or cancelled; the pointer can start a new drag.
    Ended,
}

/// Focus change produced by a pointer move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusUpdate {
    pub image: ImageId,
    pub focus: (f64, f64),
}

/// Tracks at most one drag per pointer.
#[derive(Debug, Default)]
pub struct FocusController {
    pointers: HashMap<PointerId, DragPhase>,
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, pointer: PointerId) -> DragPhase {
        self.pointers
            .get(&pointer)
            .copied()
            .unwrap_or(DragPhase::Idle)
    }

    /// Start dragging. Returns `false` (and changes nothing) if this pointer
    /// is already dragging.
    pub fn begin(&mut self, pointer: PointerId, drag: Drag) -> bool {
        if matches!(self.phase(pointer), DragPhase::Dragging(_)) {
            return false;
        }
        self.pointers.insert(pointer, DragPhase::Dragging(drag));
        true
    }

    /// New focus for a pointer move, or `None` if the pointer is not dragging.
    pub fn drag_to(&self, pointer: PointerId, position: (f64, f64)) -> Option<FocusUpdate> {
        match self.phase(pointer) {
            DragPhase::Dragging(drag) => Some(FocusUpdate {
                image: drag.image,
                focus: drag.focus_at(position),
            }),
            _ => None,
        }
    }

    /// Pointer released. Returns the drag that ended, if any.
    pub fn end(&mut self, pointer: PointerId) -> Option<Drag> {
        match self.phase(pointer) {
            DragPhase::Dragging(drag) => {
                self.pointers.insert(pointer, DragPhase::Ended);
                Some(drag)
            }
            _ => None,
        }
    }

    /// Pointer capture lost. Focus already written during the drag stays.
    pub fn cancel(&mut self, pointer: PointerId) -> Option<Drag> {
        self.end(pointer)
    }

    /// End any drag on `image` (the image was removed).
    pub fn forget_image(&mut self, image: ImageId) {
        for phase in self.pointers.values_mut() {
            if matches!(phase, DragPhase::Dragging(d) if d.image == image) {
                *phase = DragPhase::Ended;
            }
        }
    }

    /// Number of pointers currently dragging.
    pub fn active(&self) -> usize {
        self.pointers
            .values()
            .filter(|p| matches!(p, DragPhase::Dragging(_)))
            .count()
    }
}
