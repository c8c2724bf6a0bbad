//! Image source cache: image id → drawable bitmap.
//!
//! Decoding a full-resolution photo is the most expensive step of a render,
//! and the preview re-renders on every settings change or focus drag. This
//! cache makes sure each active image is decoded at most once per session.
//!
//! # Resolution order
//!
//! [`ImageSourceCache::resolve`] tries, in order:
//!
//! 1. **External bitmap** — the image record already carries a decoded
//!    bitmap handed over by the acquisition side. It is reused as is.
//! 2. **Decode strategies** — the configured [`DecodeStrategy`] list, first
//!    success wins. The production list is file bytes first, then the preview
//!    location ([`default_strategies`]).
//!
//! If every strategy fails the result is [`DecodeError`], carrying one line
//! per attempt. Failures are not memoized: a later render tries again.
//!
//! # Ownership
//!
//! Bitmaps the cache decoded are **owned** by it and released on eviction.
//! External bitmaps stay owned by their image record; the cache only drops
//! its handle to them, and [`Eviction::released`] reports `false`.
//!
//! # Eviction
//!
//! The session calls [`ImageSourceCache::retain_active`] every time the
//! active image set changes, so entries never outlive their image.

use crate::imaging::{DecodeStrategy, default_strategies};
use crate::types::{Bitmap, CollageImage, ImageId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Every decode strategy failed for an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not decode {label}: {}", attempts.join("; "))]
pub struct DecodeError {
    pub label: String,
    /// One `"strategy: reason"` line per attempt, in order.
    pub attempts: Vec<String>,
}

/// Where a cached bitmap came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapOrigin {
    /// Supplied with the image record; not ours to release.
    External,
    /// Decoded by the named strategy; released on eviction.
    Decoded(&'static str),
}

#[derive(Debug)]
struct CacheEntry {
    bitmap: Bitmap,
    origin: BitmapOrigin,
}

/// One entry removed by [`ImageSourceCache::retain_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub id: ImageId,
    /// `true` if the cache owned and released the bitmap.
    pub released: bool,
}

/// Hit/decode counters, for CLI output and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub decoded: u32,
    pub external: u32,
    pub failed: u32,
    pub released: u32,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} decoded, {} external, {} hits, {} failed",
            self.decoded, self.external, self.hits, self.failed
        )
    }
}

pub struct ImageSourceCache {
    strategies: Vec<Box<dyn DecodeStrategy>>,
    entries: HashMap<ImageId, CacheEntry>,
    stats: CacheStats,
}

impl Default for ImageSourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSourceCache {
    /// Cache with the production decode order.
    pub fn new() -> Self {
        Self::with_strategies(default_strategies())
    }

    pub fn with_strategies(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self {
            strategies,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Drawable bitmap for `image`, decoding it on first use.
    pub fn resolve(&mut self, image: &CollageImage) -> Result<Bitmap, DecodeError> {
        if let Some(entry) = self.entries.get(&image.id) {
            self.stats.hits += 1;
            return Ok(Arc::clone(&entry.bitmap));
        }

        if let Some(bitmap) = image.external_bitmap() {
            self.stats.external += 1;
            self.entries.insert(
                image.id,
                CacheEntry {
                    bitmap: Arc::clone(bitmap),
                    origin: BitmapOrigin::External,
                },
            );
            return Ok(Arc::clone(bitmap));
        }

        let mut attempts = Vec::new();
        for strategy in &self.strategies {
            match strategy.decode(&image.source) {
                Ok(decoded) => {
                    debug!(
                        image = %image.id,
                        strategy = strategy.name(),
                        width = decoded.width(),
                        height = decoded.height(),
                        "decoded"
                    );
                    let bitmap: Bitmap = Arc::new(decoded);
                    self.stats.decoded += 1;
                    self.entries.insert(
                        image.id,
                        CacheEntry {
                            bitmap: Arc::clone(&bitmap),
                            origin: BitmapOrigin::Decoded(strategy.name()),
                        },
                    );
                    return Ok(bitmap);
                }
                Err(e) => {
                    debug!(image = %image.id, strategy = strategy.name(), error = %e, "decode attempt failed");
                    attempts.push(format!("{}: {e}", strategy.name()));
                }
            }
        }

        self.stats.failed += 1;
        let err = DecodeError {
            label: image.source.label.clone(),
            attempts,
        };
        warn!(image = %image.id, "{err}");
        Err(err)
    }

    /// Drop every entry whose id is not in `active`.
    ///
    /// Returned evictions are sorted by id.
    pub fn retain_active(&mut self, active: &[ImageId]) -> Vec<Eviction> {
        let stale: Vec<ImageId> = self
            .entries
            .keys()
            .filter(|id| !active.contains(id))
            .copied()
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for id in stale {
            let Some(entry) = self.entries.remove(&id) else {
                continue;
            };
            let released = matches!(entry.origin, BitmapOrigin::Decoded(_));
            if released {
                self.stats.released += 1;
            }
            debug!(image = %id, released, "evicted");
            evicted.push(Eviction { id, released });
        }
        evicted.sort_by_key(|e| e.id);
        evicted
    }

    /// Drop everything (session end).
    pub fn clear(&mut self) -> Vec<Eviction> {
        self.retain_active(&[])
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn origin(&self, id: ImageId) -> Option<BitmapOrigin> {
        self.entries.get(&id).map(|e| e.origin)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
