//! The interception engine: ordered bookkeeping of active hooks.

use log::{debug, info, warn};

use crate::patcher::{HookBackend, HookHandle};
use crate::types::HookError;

/// Runtime record of one successfully installed override.
pub struct InstalledHook {
    name: String,
    target: usize,
    replacement: usize,
    handle: HookHandle,
}

impl InstalledHook {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn replacement(&self) -> usize {
        self.replacement
    }
}

/// Owns the set of active hooks for one load/unload cycle.
///
/// The collection is populated during bring-up and drained during teardown,
/// always from the single control thread; the redirects themselves are what
/// arbitrary concurrent callers observe. Insertion order is installation
/// order.
pub struct Interceptor {
    backend: Box<dyn HookBackend>,
    active: Vec<InstalledHook>,
}

impl Interceptor {
    pub fn new(backend: Box<dyn HookBackend>) -> Self {
        Self {
            backend,
            active: Vec::new(),
        }
    }

    /// Install a redirect from `target` to `replacement` and record it.
    ///
    /// On failure the underlying error is returned and nothing is recorded.
    pub fn register_override(
        &mut self,
        name: &str,
        target: usize,
        replacement: usize,
    ) -> Result<(), HookError> {
        let handle = self.backend.install(target, replacement)?;
        info!("Hooked {} at {:#x}", name, target);
        self.active.push(InstalledHook {
            name: name.to_owned(),
            target,
            replacement,
            handle,
        });
        Ok(())
    }

    /// Remove every active hook in reverse installation order and clear the
    /// collection.
    ///
    /// Later overrides may have been installed assuming earlier ones were
    /// already active; removing in reverse never leaves a dependent hook
    /// pointing at an unrestored target. Removal errors are logged, not
    /// propagated: this runs on teardown and rollback paths that must not
    /// themselves fail. A call with zero active hooks is a no-op.
    pub fn unregister_all(&mut self) {
        while let Some(hook) = self.active.pop() {
            debug!("Unhooking {} at {:#x}", hook.name, hook.target);
            if let Err(e) = self.backend.remove(&hook.handle) {
                warn!("Failed to unhook {}: {}", hook.name, e);
            }
        }
    }

    /// Active hooks, in installation order.
    pub fn active(&self) -> &[InstalledHook] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Backend double that records install/remove order and can be told to
    /// refuse a particular target.
    struct RecordingBackend {
        events: Arc<Mutex<Vec<String>>>,
        fail_install_at: Option<usize>,
        fail_remove_at: Option<usize>,
    }

    impl RecordingBackend {
        fn new(events: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                events,
                fail_install_at: None,
                fail_remove_at: None,
            }
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl HookBackend for RecordingBackend {
        fn install(&self, target: usize, replacement: usize) -> Result<HookHandle, HookError> {
            if self.fail_install_at == Some(target) {
                return Err(HookError::AllocationFailed);
            }
            self.push(format!("install {target:#x}"));
            let _ = replacement;
            Ok(HookHandle::new(target, target))
        }

        fn remove(&self, handle: &HookHandle) -> Result<(), HookError> {
            if self.fail_remove_at == Some(handle.target()) {
                return Err(HookError::NotInstalled(handle.target()));
            }
            self.push(format!("remove {:#x}", handle.target()));
            Ok(())
        }
    }

    fn events(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn unregister_all_removes_in_reverse_installation_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = Interceptor::new(Box::new(RecordingBackend::new(log.clone())));

        engine.register_override("first", 0x1000, 0x2000).unwrap();
        engine.register_override("second", 0x3000, 0x4000).unwrap();
        engine.register_override("third", 0x5000, 0x6000).unwrap();
        assert_eq!(engine.len(), 3);

        log.lock().unwrap().clear();
        engine.unregister_all();

        assert!(engine.is_empty());
        assert_eq!(
            events(&log),
            vec!["remove 0x5000", "remove 0x3000", "remove 0x1000"]
        );
    }

    #[test]
    fn failed_install_leaves_state_untouched() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut backend = RecordingBackend::new(log);
        backend.fail_install_at = Some(0x3000);
        let mut engine = Interceptor::new(Box::new(backend));

        engine.register_override("first", 0x1000, 0x2000).unwrap();
        assert_eq!(
            engine.register_override("second", 0x3000, 0x4000),
            Err(HookError::AllocationFailed)
        );

        assert_eq!(engine.len(), 1);
        assert_eq!(engine.active()[0].name(), "first");
    }

    #[test]
    fn unregister_all_on_empty_engine_is_a_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = Interceptor::new(Box::new(RecordingBackend::new(log.clone())));

        engine.unregister_all();
        engine.unregister_all();

        assert!(engine.is_empty());
        assert!(events(&log).is_empty());
    }

    #[test]
    fn removal_errors_are_swallowed_and_draining_continues() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut backend = RecordingBackend::new(log.clone());
        backend.fail_remove_at = Some(0x3000);
        let mut engine = Interceptor::new(Box::new(backend));

        engine.register_override("first", 0x1000, 0x2000).unwrap();
        engine.register_override("second", 0x3000, 0x4000).unwrap();

        log.lock().unwrap().clear();
        engine.unregister_all();

        // The failing remove is skipped but the earlier hook still drains.
        assert!(engine.is_empty());
        assert_eq!(events(&log), vec!["remove 0x1000"]);
    }
}
