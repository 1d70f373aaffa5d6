//! Dispatch slots: the redirect table entries patched by [`SlotPatcher`].
//!
//! A [`DispatchSlot`] is an address-sized cell that callers load a function
//! address from immediately before each call. Redirecting a slot is a single
//! atomic swap, so an in-flight caller observes either the fully-original or
//! the fully-redirected destination, never a torn intermediate state.
//!
//! [`SlotPatcher`]: crate::patcher::SlotPatcher

use core::sync::atomic::{AtomicUsize, Ordering};

/// One dispatch table entry.
///
/// The slot's own address is the hook target handed to the interception
/// machinery; the value it holds is the current transfer destination.
#[repr(transparent)]
pub struct DispatchSlot(AtomicUsize);

impl DispatchSlot {
    /// Create a slot initially dispatching to `function`.
    pub fn new(function: usize) -> Self {
        Self(AtomicUsize::new(function))
    }

    /// Address of this slot, used as the hook target.
    pub fn target(&self) -> usize {
        self as *const Self as usize
    }

    /// Current dispatch destination.
    pub fn destination(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Atomically redirect the slot, returning the previous destination.
    pub(crate) fn redirect(&self, replacement: usize) -> usize {
        self.0.swap(replacement, Ordering::AcqRel)
    }

    /// Restore a previously recorded destination.
    pub(crate) fn restore(&self, original: usize) {
        self.0.store(original, Ordering::Release);
    }
}
