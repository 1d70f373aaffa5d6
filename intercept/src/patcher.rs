//! The hook primitive: a narrow seam over the low-level redirect mechanism.
//!
//! Everything above this module depends only on [`HookBackend`]; the actual
//! redirection technique (inline trampoline, import-table patch, dispatch
//! table) is an implementation detail of the backend. The built-in
//! [`SlotPatcher`] redirects [`DispatchSlot`] entries.

use std::collections::HashSet;
use std::sync::Mutex;

use log::debug;

use crate::slot::DispatchSlot;
use crate::types::HookError;

/// Opaque record of one successful install. Holds enough state to restore
/// the original transfer exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookHandle {
    target: usize,
    original: usize,
}

impl HookHandle {
    /// Record a handle for a redirect the backend has just installed.
    pub fn new(target: usize, original: usize) -> Self {
        Self { target, original }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// The transfer destination in effect before the install.
    pub fn original(&self) -> usize {
        self.original
    }
}

/// The low-level redirect mechanism.
///
/// `install` must take effect atomically with respect to concurrent callers
/// of `target`: an in-flight control transfer observes either the
/// fully-original or the fully-redirected destination. `remove` restores the
/// original transfer exactly and is valid once per successful install;
/// removing a handle that was never installed is a caller bug and reported
/// as [`HookError::NotInstalled`].
pub trait HookBackend: Send {
    fn install(&self, target: usize, replacement: usize) -> Result<HookHandle, HookError>;
    fn remove(&self, handle: &HookHandle) -> Result<(), HookError>;
}

/// Dispatch-table backend.
///
/// Targets must be addresses of live [`DispatchSlot`] cells owned by the
/// caller and valid for the whole lifetime of the hook. Installing swaps the
/// slot to the replacement in one atomic operation and remembers the
/// previous destination; removing stores it back.
#[derive(Default)]
pub struct SlotPatcher {
    installed: Mutex<HashSet<usize>>,
}

impl SlotPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<usize>> {
        self.installed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HookBackend for SlotPatcher {
    fn install(&self, target: usize, replacement: usize) -> Result<HookHandle, HookError> {
        let mut installed = self.lock();
        if !installed.insert(target) {
            return Err(HookError::AlreadyInstalled(target));
        }

        // Contract: target is the address of a DispatchSlot that stays live
        // while the hook is installed.
        let slot = unsafe { &*(target as *const DispatchSlot) };
        let original = slot.redirect(replacement);
        debug!(
            "Installed redirect at {:#x}: {:#x} -> {:#x}",
            target, original, replacement
        );
        Ok(HookHandle { target, original })
    }

    fn remove(&self, handle: &HookHandle) -> Result<(), HookError> {
        let mut installed = self.lock();
        if !installed.remove(&handle.target) {
            return Err(HookError::NotInstalled(handle.target));
        }

        let slot = unsafe { &*(handle.target as *const DispatchSlot) };
        slot.restore(handle.original);
        debug!(
            "Removed redirect at {:#x}, restored {:#x}",
            handle.target, handle.original
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn add_one(x: i64) -> i64 {
        x + 1
    }

    extern "C" fn add_hundred(x: i64) -> i64 {
        x + 100
    }

    fn call(slot: &DispatchSlot, x: i64) -> i64 {
        let f: extern "C" fn(i64) -> i64 = unsafe { core::mem::transmute(slot.destination()) };
        f(x)
    }

    #[test]
    fn install_and_remove_round_trip() {
        let slot = DispatchSlot::new(add_one as usize);
        let patcher = SlotPatcher::new();

        assert_eq!(call(&slot, 1), 2);

        let handle = patcher
            .install(slot.target(), add_hundred as usize)
            .unwrap();
        assert_eq!(call(&slot, 1), 101);
        assert_eq!(handle.original(), add_one as usize);

        patcher.remove(&handle).unwrap();
        assert_eq!(call(&slot, 1), 2);
    }

    #[test]
    fn double_install_on_same_target_conflicts() {
        let slot = DispatchSlot::new(add_one as usize);
        let patcher = SlotPatcher::new();

        let handle = patcher
            .install(slot.target(), add_hundred as usize)
            .unwrap();
        assert_eq!(
            patcher.install(slot.target(), add_hundred as usize),
            Err(HookError::AlreadyInstalled(slot.target()))
        );

        // The first install stays intact.
        assert_eq!(call(&slot, 1), 101);
        patcher.remove(&handle).unwrap();
    }

    #[test]
    fn remove_without_install_is_reported() {
        let slot = DispatchSlot::new(add_one as usize);
        let patcher = SlotPatcher::new();

        let handle = patcher
            .install(slot.target(), add_hundred as usize)
            .unwrap();
        patcher.remove(&handle).unwrap();
        assert_eq!(
            patcher.remove(&handle),
            Err(HookError::NotInstalled(slot.target()))
        );
    }

    /// Callers racing with install/remove must observe either the original
    /// or the replacement behavior, never anything else.
    #[test]
    fn concurrent_callers_see_original_or_replacement() {
        let slot: &'static DispatchSlot = Box::leak(Box::new(DispatchSlot::new(add_one as usize)));
        let patcher = SlotPatcher::new();

        let callers: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(move || {
                    for x in 0..2000i64 {
                        let got = call(slot, x);
                        assert!(
                            got == x + 1 || got == x + 100,
                            "torn dispatch: f({x}) returned {got}"
                        );
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            let handle = patcher
                .install(slot.target(), add_hundred as usize)
                .unwrap();
            patcher.remove(&handle).unwrap();
        }

        for c in callers {
            c.join().expect("caller thread panicked");
        }
    }
}
