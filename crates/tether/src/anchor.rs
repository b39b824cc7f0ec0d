//! The ownership anchor: the capability a type embeds to become guardable.
//!
//! An [`Anchor`] lives inside the guarded type as an ordinary field. It
//! lazily creates the shared control block the first time a handle is bound
//! and, when the embedding value is destroyed, severs the block's pointee
//! link so every outstanding handle flips to not-alive.

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::block::LiveBlock;

/// Capability contract for types observable through a
/// [`Tether`](crate::Tether).
///
/// A type opts in by embedding an [`Anchor`] and pointing the trait at it:
///
/// ```rust
/// use tether::{Anchor, Anchored};
///
/// struct Widget {
///     anchor: Anchor<Widget>,
///     label: &'static str,
/// }
///
/// impl Anchored for Widget {
///     fn anchor(&self) -> &Anchor<Widget> {
///         &self.anchor
///     }
/// }
/// ```
///
/// Handle construction is only defined for `Anchored` types, so binding a
/// handle to a type without the capability is a missing-impl compile error,
/// never a runtime check.
pub trait Anchored: Sized {
    /// The anchor embedded in this value.
    fn anchor(&self) -> &Anchor<Self>;
}

/// Bridges the guarded object's lifetime to its shared control block.
///
/// Holds exactly one owner unit of the block's count for as long as the
/// embedding value lives. The block itself is created lazily by the first
/// bound handle — a value that is never observed never allocates — and the
/// slot is installed at most once, first writer wins.
pub struct Anchor<T> {
    /// The shared block, or null while no handle has ever been bound.
    block: AtomicPtr<LiveBlock<T>>,
}

// Compile-time assertion: Anchor must be Send + Sync regardless of the
// embedding type — it never dereferences the pointee, and the block it
// hands out is itself fully atomic.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Anchor<*mut ()>>();
};

impl<T> Anchor<T> {
    /// An anchor with no block; the first bound handle allocates one.
    pub const fn new() -> Self {
        Self {
            block: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Current owner count of the shared block, or 0 while none exists.
    ///
    /// Inherently stale when read while other owners are active;
    /// diagnostics only.
    pub fn ref_count(&self) -> u32 {
        match NonNull::new(self.block.load(Ordering::Acquire)) {
            // SAFETY: the anchor's own unit keeps an installed block live
            // for the anchor's whole lifetime.
            Some(block) => unsafe { block.as_ref() }.ref_count(),
            None => 0,
        }
    }

    /// Fetch the shared block for a handle being bound to `pointee`,
    /// adding one owner unit for the caller. Creates and installs the
    /// block on first use.
    ///
    /// Only reachable while the embedding value — and therefore this
    /// anchor — is alive, so the anchor's own unit pins the count above
    /// zero for the whole call. That is what makes the lost-race path
    /// below safe: the winner's block cannot be freed between its install
    /// and the loser's extra `acquire`.
    pub(crate) fn register(&self, pointee: *mut T) -> NonNull<LiveBlock<T>> {
        if let Some(block) = NonNull::new(self.block.load(Ordering::Acquire)) {
            // SAFETY: installed block, live per the anchor's unit.
            unsafe { block.as_ref() }.acquire();
            return block;
        }

        // No block yet. Create one optimistically — count 2, covering the
        // anchor's unit and the calling handle's — and race to install it.
        let fresh = LiveBlock::create(pointee);
        match self.block.compare_exchange(
            ptr::null_mut(),
            fresh.as_ptr(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => fresh,
            Err(winner) => {
                // Another thread installed first. The fresh block was never
                // published anywhere, so it can be dropped outright; take
                // the caller's unit on the winner instead.
                // SAFETY: `fresh` came from `LiveBlock::create` above and
                // no other thread has seen it.
                drop(unsafe { Box::from_raw(fresh.as_ptr()) });
                // SAFETY: we lost a first-writer-wins race against a
                // non-null install, and the anchor's unit keeps the winner
                // live (see above).
                let winner = unsafe { NonNull::new_unchecked(winner) };
                unsafe { winner.as_ref() }.acquire();
                winner
            }
        }
    }
}

impl<T> Default for Anchor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Anchor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl<T> Drop for Anchor<T> {
    /// Severs the pointee link, then gives up the anchor's owner unit.
    ///
    /// Outstanding handles keep the block alive and observe not-alive from
    /// this point on; with no handles left, the release here frees the
    /// block immediately.
    fn drop(&mut self) {
        if let Some(block) = NonNull::new(*self.block.get_mut()) {
            // SAFETY: the anchor still holds its unit, so the block is
            // live. Whether or not this release was the final one, the
            // block is never touched again.
            unsafe {
                block.as_ref().sever();
                LiveBlock::release(block);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_block_until_first_register() {
        let anchor: Anchor<u32> = Anchor::new();
        assert_eq!(anchor.ref_count(), 0);
        // Dropping an anchor that never registered is a no-op.
    }

    #[test]
    fn register_creates_block_with_two_owners() {
        let mut value = 11u32;
        let anchor: Anchor<u32> = Anchor::new();
        let block = anchor.register(&mut value);
        // SAFETY: the register above granted this test one count unit.
        unsafe {
            assert_eq!(block.as_ref().ref_count(), 2);
            assert_eq!(block.as_ref().pointee(), &mut value as *mut u32);
            assert!(LiveBlock::release(block));
        }
        assert_eq!(anchor.ref_count(), 1);
    }

    #[test]
    fn second_register_reuses_the_block() {
        let mut value = 0u8;
        let anchor: Anchor<u8> = Anchor::new();
        let first = anchor.register(&mut value);
        let second = anchor.register(&mut value);
        assert_eq!(first, second);
        assert_eq!(anchor.ref_count(), 3);
        // SAFETY: release the two units granted above.
        unsafe {
            assert!(LiveBlock::release(first));
            assert!(LiveBlock::release(second));
        }
    }

    #[test]
    fn drop_severs_before_releasing() {
        let mut value = 9i32;
        let anchor: Anchor<i32> = Anchor::new();
        let block = anchor.register(&mut value);
        drop(anchor);
        // SAFETY: this test's unit is still outstanding.
        unsafe {
            assert!(block.as_ref().pointee().is_null());
            assert_eq!(block.as_ref().ref_count(), 1);
            assert!(!LiveBlock::release(block));
        }
    }
}
