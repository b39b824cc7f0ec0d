//! The guarded handle: a non-owning pointer that knows when its target died.

use std::fmt;
use std::pin::Pin;
use std::ptr::{self, NonNull};

use crate::anchor::Anchored;
use crate::block::LiveBlock;

/// A non-owning handle to an externally-owned `T`, safe to query after the
/// `T` has been destroyed.
///
/// `Tether` never manages the target's lifetime. Whoever owns the object —
/// a UI framework, an arena, plain `Box`-holding code — destroys it as
/// usual, and at that moment every handle bound to it flips to not-alive.
/// What a handle owns is one unit on the shared control block, which both
/// sides release independently; the block outlives whichever of them goes
/// first.
///
/// # Thread safety
///
/// The shared state behind a handle is atomic: any number of threads may
/// hold their own handles to one object and poll [`is_alive`] concurrently.
/// A single `Tether` value follows ordinary aliasing rules — mutation
/// ([`clear`], [`rebind`], assignment, drop) needs `&mut self`, which the
/// borrow checker confines to one thread at a time.
///
/// # Liveness is a snapshot
///
/// `is_alive()` returning `true` means the target was alive at the moment
/// of the load, nothing more; the owner may destroy it before the next
/// line runs. The guarantee is "no dangling dereference through the safe
/// API", not temporal consistency, which is why the unchecked access path
/// is an `unsafe fn`.
///
/// [`is_alive`]: Tether::is_alive
/// [`clear`]: Tether::clear
/// [`rebind`]: Tether::rebind
pub struct Tether<T: Anchored> {
    /// `None` is the empty state; `Some` holds one owner unit on the block.
    block: Option<NonNull<LiveBlock<T>>>,
}

// SAFETY: the block's state is atomic, and a shared `&Tether` exposes only
// atomic loads plus `&T` access — so crossing threads is sound exactly when
// the target itself may be shared across threads.
unsafe impl<T: Anchored + Sync> Send for Tether<T> {}
unsafe impl<T: Anchored + Sync> Sync for Tether<T> {}

impl<T: Anchored> Tether<T> {
    /// An empty handle, bound to nothing and never alive.
    pub const fn empty() -> Self {
        Self { block: None }
    }

    /// Bind a new handle to `target`, allocating the shared control block
    /// on first observation of this value.
    ///
    /// The pin is the construction contract: the target stays at this
    /// address until its owner destroys it, which is what lets every later
    /// liveness answer refer to the same object.
    pub fn bind(target: Pin<&T>) -> Self {
        let target = target.get_ref();
        let block = target.anchor().register(target as *const T as *mut T);
        Self { block: Some(block) }
    }

    /// Bind to a framework-owned raw pointer, or return an empty handle
    /// when `ptr` is null.
    ///
    /// This is the constructor for targets whose owner only ever exposes
    /// raw pointers.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a live `T` whose address stays
    /// stable until the moment external code destroys it. Destruction
    /// itself is fine — detecting it is what this type is for.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        // SAFETY: caller contract — `ptr` is null or points to a live `T`.
        match unsafe { ptr.as_ref() } {
            Some(target) => Self {
                block: Some(target.anchor().register(ptr)),
            },
            None => Self::empty(),
        }
    }

    /// The block this handle is bound to, if any.
    fn block(&self) -> Option<&LiveBlock<T>> {
        // SAFETY: a bound handle owns one unit of the block's count, so
        // the block outlives the binding.
        self.block.map(|block| unsafe { &*block.as_ptr() })
    }

    /// Whether the target was alive at the moment of the call.
    ///
    /// Always `false` for an empty handle. See the type-level note on
    /// liveness being a snapshot.
    pub fn is_alive(&self) -> bool {
        self.block().is_some_and(|block| !block.pointee().is_null())
    }

    /// Current target address, or null once the target is gone (or for an
    /// empty handle).
    pub fn as_ptr(&self) -> *const T {
        self.block()
            .map_or(ptr::null(), |block| block.pointee() as *const T)
    }

    /// Borrow the target without a liveness check — the deliberately
    /// unchecked fast path. The intended pattern is a check immediately
    /// before use:
    ///
    /// ```rust
    /// # use tether::{Anchor, Anchored, Tether};
    /// # struct W { anchor: Anchor<W>, n: u32 }
    /// # impl Anchored for W { fn anchor(&self) -> &Anchor<W> { &self.anchor } }
    /// # let w = Box::pin(W { anchor: Anchor::new(), n: 4 });
    /// # let handle = Tether::bind(w.as_ref());
    /// if handle.is_alive() {
    ///     // SAFETY: the owner only destroys the target on this thread,
    ///     // so the check above still holds.
    ///     let n = unsafe { handle.get_unchecked() }.n;
    /// #   assert_eq!(n, 4);
    /// }
    /// ```
    ///
    /// # Safety
    ///
    /// The target must be alive for the whole life of the returned borrow,
    /// and no `&mut T` to it may exist during that time. A preceding
    /// [`is_alive`](Tether::is_alive) check is necessary but not
    /// sufficient when another thread can destroy the target concurrently;
    /// in that case the caller needs an external happens-before argument.
    pub unsafe fn get_unchecked(&self) -> &T {
        // SAFETY: caller contract — the target is live.
        unsafe { &*self.as_ptr() }
    }

    /// Shared owner count of the block this handle is bound to, or 0 for
    /// an empty handle.
    ///
    /// Inherently stale when other owners are active; diagnostics only,
    /// never a synchronization primitive.
    pub fn ref_count(&self) -> u32 {
        self.block().map_or(0, LiveBlock::ref_count)
    }

    /// Whether two handles are bound to the same control block — that is,
    /// observing the same target. Two empty handles compare equal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.block == other.block
    }

    /// Release this handle's owner unit and go empty.
    ///
    /// If this was the last unit, the block is freed here and now.
    pub fn clear(&mut self) {
        if let Some(block) = self.block.take() {
            // SAFETY: the handle owned exactly one unit, surrendered
            // exactly once — `take` has already emptied the slot.
            unsafe { LiveBlock::release(block) };
        }
    }

    /// Move the binding out, leaving this handle empty.
    ///
    /// The returned handle inherits the binding as-is; the owner count
    /// does not change.
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
        }
    }

    /// Rebind this handle to `target`.
    ///
    /// The new block's unit is acquired before the old one is released, so
    /// the swap never passes through a state where a concurrent teardown
    /// could free a block that is still needed.
    pub fn rebind(&mut self, target: Pin<&T>) {
        *self = Tether::bind(target);
    }
}

impl<T: Anchored> Clone for Tether<T> {
    /// Copying a bound handle adds one owner unit; copying an empty handle
    /// is free.
    fn clone(&self) -> Self {
        if let Some(block) = self.block() {
            block.acquire();
        }
        Self { block: self.block }
    }

    fn clone_from(&mut self, source: &Self) {
        // Already bound to the same block (or both empty): count no-op.
        if self.block == source.block {
            return;
        }
        if let Some(block) = source.block() {
            block.acquire();
        }
        self.clear();
        self.block = source.block;
    }
}

impl<T: Anchored> Default for Tether<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Anchored> Drop for Tether<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Anchored> fmt::Debug for Tether<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Tether");
        match self.block() {
            Some(block) => s
                .field("alive", &!block.pointee().is_null())
                .field("ref_count", &block.ref_count()),
            None => s.field("alive", &false).field("ref_count", &0u32),
        }
        .finish()
    }
}
