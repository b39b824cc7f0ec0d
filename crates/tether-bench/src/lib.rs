//! Shared helpers for tether benchmarks and examples.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::pin::Pin;

use tether::Tether;
use tether_test_utils::{DropCounter, TrackedWidget};

/// A pinned widget with `handles` bound observers, ready for churn.
pub fn observed_widget(
    handles: usize,
) -> (
    Pin<Box<TrackedWidget>>,
    Vec<Tether<TrackedWidget>>,
    DropCounter,
) {
    let drops = DropCounter::new();
    let widget = TrackedWidget::pinned(0, &drops);
    let bound = (0..handles)
        .map(|_| Tether::bind(widget.as_ref()))
        .collect();
    (widget, bound, drops)
}
