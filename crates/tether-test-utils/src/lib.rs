//! Test fixtures for tether development.
//!
//! Provides [`TrackedWidget`], a pinned heap value implementing
//! [`Anchored`] whose destruction bumps a shared [`DropCounter`], so tests
//! can assert destruction ordering and the absence of double-frees.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tether::{Anchor, Anchored};

/// Shared counter recording how many fixtures have been destroyed.
///
/// Clones observe the same count, so a test can keep one and hand others
/// to fixtures or threads.
#[derive(Clone, Debug, Default)]
pub struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked fixtures destroyed so far.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A heap-pinned widget that opts into guarded observation and records its
/// own destruction.
pub struct TrackedWidget {
    anchor: Anchor<TrackedWidget>,
    drops: DropCounter,
    value: u32,
}

impl TrackedWidget {
    /// Build a pinned widget whose destruction bumps `drops`.
    pub fn pinned(value: u32, drops: &DropCounter) -> Pin<Box<Self>> {
        Box::pin(Self {
            anchor: Anchor::new(),
            drops: drops.clone(),
            value,
        })
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

impl Anchored for TrackedWidget {
    fn anchor(&self) -> &Anchor<TrackedWidget> {
        &self.anchor
    }
}

impl Drop for TrackedWidget {
    fn drop(&mut self) {
        self.drops.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_counter_tracks_destruction() {
        let drops = DropCounter::new();
        let widget = TrackedWidget::pinned(1, &drops);
        assert_eq!(drops.count(), 0);
        drop(widget);
        assert_eq!(drops.count(), 1);
    }

    #[test]
    fn widget_exposes_its_anchor() {
        let drops = DropCounter::new();
        let widget = TrackedWidget::pinned(3, &drops);
        assert_eq!(widget.anchor().ref_count(), 0);
        assert_eq!(widget.value(), 3);
    }
}
