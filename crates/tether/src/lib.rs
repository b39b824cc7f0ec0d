//! Non-owning handles that know when their target has been destroyed.
//!
//! Some objects cannot be put behind `Rc`/`Arc` because a third party —
//! typically a UI framework — already owns them and decides when they die.
//! `tether` guards raw access to such objects: a [`Tether<T>`] can always
//! be asked whether its target is still alive, even long after the owner
//! destroyed it, without ever touching freed memory.
//!
//! # Architecture
//!
//! ```text
//! guarded value (framework-owned)          observers
//! ┌──────────────────────┐           ┌──────────────┐
//! │ T { Anchor<T>, ... } │           │  Tether<T> × N│
//! └──────────┬───────────┘           └──────┬───────┘
//!            │ one owner unit               │ one owner unit each
//!            ▼                              ▼
//!        ┌──────────────────────────────────────┐
//!        │ LiveBlock: AtomicPtr<T> + AtomicU32  │  (crate-private)
//!        └──────────────────────────────────────┘
//! ```
//!
//! The block is created lazily by the first bound handle. When the value
//! is destroyed, its embedded [`Anchor`] severs the block's pointee link
//! (every handle now answers not-alive) and releases its unit; the block
//! frees itself when the last unit — anchor's or any handle's — is gone.
//!
//! # Quick start
//!
//! ```rust
//! use tether::{Anchor, Anchored, Tether};
//!
//! struct Widget {
//!     anchor: Anchor<Widget>,
//!     label: &'static str,
//! }
//!
//! impl Anchored for Widget {
//!     fn anchor(&self) -> &Anchor<Widget> {
//!         &self.anchor
//!     }
//! }
//!
//! // The owner holds the widget; we only observe it.
//! let widget = Box::pin(Widget { anchor: Anchor::new(), label: "ok" });
//! let handle = Tether::bind(widget.as_ref());
//!
//! assert!(handle.is_alive());
//! assert_eq!(handle.ref_count(), 2); // the anchor plus this handle
//! // SAFETY: `widget` is alive and unaliased for the whole call.
//! assert_eq!(unsafe { handle.get_unchecked() }.label, "ok");
//!
//! drop(widget); // the owner destroys it
//! assert!(!handle.is_alive());
//! ```
//!
//! # What is and is not guaranteed
//!
//! - Liveness queries and handle copies are safe from any thread; the
//!   shared block is fully atomic and lock-free.
//! - A `true` from [`Tether::is_alive`] is a snapshot, not a lease: if
//!   another thread may destroy the target, the unchecked access path
//!   needs its own happens-before argument — which is why it is `unsafe`.
//! - The target's lifetime is never extended. This is not a shared-
//!   ownership pointer; only the external owner ever destroys the value.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod anchor;
mod block;
mod handle;

pub use anchor::{Anchor, Anchored};
pub use handle::Tether;
