//! Cooperative cancellation for render passes.
//!
//! Every render is issued with its own [`CancelToken`]. The session cancels
//! the previous token before starting a new pass, and the render loop calls
//! [`CancelToken::check`] at each suspension point (around decode and
//! resample) so a superseded pass stops at the next cell boundary.
//!
//! Cancellation is not an error. [`Cancelled`] exists so the render loop can
//! bail out with `?`; it is converted into
//! [`RenderOutcome::Cancelled`](crate::compositor::RenderOutcome) and never
//! logged as a failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marker returned by [`CancelToken::check`] once the token is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Shared flag; clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
