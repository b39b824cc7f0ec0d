//! The shared control block behind every bound handle.
//!
//! A [`LiveBlock`] is the one heap resource this crate manages directly:
//! the guarded object's address plus an atomic count of its owners (the
//! embedding [`Anchor`](crate::Anchor) and every bound
//! [`Tether`](crate::Tether)). The block frees itself when the final owner
//! lets go; the memory-ordering discipline is the classic `Arc` protocol —
//! relaxed increments, release decrements, acquire fence before the free.

use std::process::abort;
use std::ptr::{self, NonNull};
use std::sync::atomic::{fence, AtomicPtr, AtomicU32, Ordering};

/// Counts anywhere near this value can only mean acquire/release
/// bookkeeping has broken down; abort before the counter can wrap and turn
/// a later release into a free under live owners.
const MAX_REFS: u32 = i32::MAX as u32;

/// Shared liveness state for one guarded object.
///
/// Crate-private: callers only ever touch a block through an
/// [`Anchor`](crate::Anchor) or a [`Tether`](crate::Tether). The pointee
/// address is written exactly twice over the block's whole life — the
/// original address at creation, null at the anchor's teardown — and the
/// count holds one unit per live owner.
pub(crate) struct LiveBlock<T> {
    /// Address of the guarded object; null once severed. Never repointed
    /// at a different object and never un-severed.
    pointee: AtomicPtr<T>,
    /// One unit per live owner: the anchor, plus each bound handle.
    refs: AtomicU32,
}

// Compile-time assertion: LiveBlock must be Send + Sync regardless of the
// target type — it stores the address atomically and never dereferences it.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<LiveBlock<*mut ()>>();
};

impl<T> LiveBlock<T> {
    /// Allocate a block for `pointee` with an initial count of 2: one unit
    /// for the anchor that will hold the slot, one for the handle whose
    /// construction triggered the allocation.
    ///
    /// Allocation failure is fatal (the global allocator's OOM handler);
    /// there is no recovery path.
    pub(crate) fn create(pointee: *mut T) -> NonNull<Self> {
        let block = Box::new(Self {
            pointee: AtomicPtr::new(pointee),
            refs: AtomicU32::new(2),
        });
        NonNull::from(Box::leak(block))
    }

    /// Current pointee address, or null once severed.
    pub(crate) fn pointee(&self) -> *mut T {
        self.pointee.load(Ordering::Acquire)
    }

    /// Permanently clear the pointee address. Idempotent; called exactly
    /// once, by the anchor's teardown.
    pub(crate) fn sever(&self) {
        self.pointee.store(ptr::null_mut(), Ordering::Release);
    }

    /// Add one owner unit.
    pub(crate) fn acquire(&self) {
        if self.refs.fetch_add(1, Ordering::Relaxed) > MAX_REFS {
            abort();
        }
    }

    /// Drop one owner unit. Returns `false` if this call freed the block:
    /// the caller must not touch `block` again and must forget any copy of
    /// the pointer it still holds.
    ///
    /// The decrement and the "am I now the freer" check are a single
    /// `fetch_sub`: exactly one caller observes the 1 → 0 transition, so
    /// the free happens exactly once even under concurrent releases.
    ///
    /// # Safety
    ///
    /// `block` must point to a live `LiveBlock` on which the caller owns
    /// one count unit.
    pub(crate) unsafe fn release(block: NonNull<Self>) -> bool {
        // SAFETY: the caller's unit keeps the block live up to this point.
        if unsafe { block.as_ref() }.refs.fetch_sub(1, Ordering::Release) == 1 {
            // Synchronise with every prior release before touching the
            // block's contents non-atomically in drop.
            fence(Ordering::Acquire);
            // SAFETY: this caller alone observed the 1 -> 0 transition and
            // is now the sole owner of the allocation from `create`.
            drop(unsafe { Box::from_raw(block.as_ptr()) });
            false
        } else {
            true
        }
    }

    /// Snapshot of the owner count. Stale the instant it is read while
    /// other owners are active; diagnostics only.
    pub(crate) fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::Relaxed)
    }
}
