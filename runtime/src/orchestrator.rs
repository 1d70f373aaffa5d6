//! The stage orchestrator: ordered bring-up over the registry categories,
//! rollback-safe failure handling, and symmetric reverse-order teardown.
//!
//! The stage order encodes dependency layers. Aliases are populated before
//! anything that calls through them; updaters that patch host state run
//! before the overrides that may rely on it, and are unpatched after the
//! overrides are removed; FINAL_INIT runs last because it may depend on
//! everything else being stable.

use graft_intercept::{HookBackend, InstalledHook, Interceptor};
use log::{debug, error, info, warn};

use crate::descriptor::{Category, Descriptor};
use crate::error::LoadError;
use crate::registry::Registry;
use crate::resolver::{SymbolResolver, SymbolSource};

/// Lifecycle state of the extension runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Idle,
    BringUp(Category),
    Running,
    Failed(Category),
    ShuttingDown,
    Stopped,
}

/// Drives bring-up and teardown over the registry, single control thread,
/// stages strictly sequential.
pub struct Orchestrator {
    registry: Registry,
    resolver: SymbolResolver,
    interceptor: Interceptor,
    state: ModuleState,
}

impl Orchestrator {
    pub fn new(
        registry: Registry,
        source: Box<dyn SymbolSource>,
        backend: Box<dyn HookBackend>,
    ) -> Self {
        Self {
            registry,
            resolver: SymbolResolver::new(source),
            interceptor: Interceptor::new(backend),
            state: ModuleState::Idle,
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Active overrides, in installation order.
    pub fn active_hooks(&self) -> &[InstalledHook] {
        self.interceptor.active()
    }

    /// Run the seven bring-up stages in order.
    ///
    /// A failing stage aborts immediately, unwinds every previously
    /// completed stage in reverse order, and reports the first error; the
    /// caller denies the load. Completing all stages transitions to
    /// `Running`. Single-shot: from any state but `Idle` this is a logged
    /// no-op.
    pub fn start(&mut self) -> Result<(), LoadError> {
        if self.state != ModuleState::Idle {
            warn!("start() ignored in state {:?}", self.state);
            return Ok(());
        }

        for (completed, &stage) in Category::ALL.iter().enumerate() {
            self.state = ModuleState::BringUp(stage);
            if let Err(err) = self.run_stage(stage) {
                error!("Stage {} failed: {}", stage, err);
                self.unwind(completed);
                self.state = ModuleState::Failed(stage);
                return Err(err);
            }
        }

        info!("All stages complete, extensions running");
        self.state = ModuleState::Running;
        Ok(())
    }

    /// Symmetric teardown; valid only from `Running`.
    ///
    /// Every teardown step runs to completion regardless of individual
    /// failures, so the host is never left half-unloaded.
    pub fn stop(&mut self) {
        if self.state != ModuleState::Running {
            warn!("stop() ignored in state {:?}", self.state);
            return;
        }

        self.state = ModuleState::ShuttingDown;
        self.unwind(Category::ALL.len());
        info!("All extensions stopped");
        self.state = ModuleState::Stopped;
    }

    fn run_stage(&mut self, stage: Category) -> Result<(), LoadError> {
        debug!("Entering stage {}", stage);
        match stage {
            Category::EarlyInit | Category::NormalInit | Category::FinalInit => {
                self.run_inits(stage)
            }
            Category::SymbolAlias => self.run_aliases(),
            Category::EarlyUpdater | Category::NormalUpdater => self.run_updaters(stage),
            Category::FunctionOverride => self.run_overrides(),
        }
    }

    /// Unwind the first `completed` stages in reverse bring-up order.
    fn unwind(&mut self, completed: usize) {
        for &stage in Category::ALL[..completed].iter().rev() {
            debug!("Rolling back stage {}", stage);
            match stage {
                Category::EarlyInit | Category::NormalInit | Category::FinalInit => {
                    self.run_exits(stage)
                }
                // Alias population is inert; nothing to undo.
                Category::SymbolAlias => {}
                Category::EarlyUpdater | Category::NormalUpdater => self.run_restores(stage),
                Category::FunctionOverride => self.interceptor.unregister_all(),
            }
        }
    }

    fn run_inits(&mut self, stage: Category) -> Result<(), LoadError> {
        for d in self.registry.category_mut(stage) {
            if let Descriptor::EarlyInit(args)
            | Descriptor::NormalInit(args)
            | Descriptor::FinalInit(args) = d
            {
                info!("Calling init {}", args.name);
                args.init().map_err(|source| LoadError::Callback {
                    name: args.name.clone(),
                    stage,
                    source,
                })?;
            }
        }
        Ok(())
    }

    fn run_exits(&mut self, stage: Category) {
        for d in self.registry.category_mut(stage) {
            if let Descriptor::EarlyInit(args)
            | Descriptor::NormalInit(args)
            | Descriptor::FinalInit(args) = d
            {
                info!("Calling exit {}", args.name);
                args.exit();
            }
        }
    }

    fn run_aliases(&mut self) -> Result<(), LoadError> {
        let Self {
            registry, resolver, ..
        } = self;
        for d in registry.category_mut(Category::SymbolAlias) {
            let Descriptor::SymbolAlias(args) = d else {
                continue;
            };
            resolver.populate_alias(args)?;
        }
        Ok(())
    }

    fn run_updaters(&mut self, stage: Category) -> Result<(), LoadError> {
        for d in self.registry.category_mut(stage) {
            if let Descriptor::EarlyUpdater(args) | Descriptor::NormalUpdater(args) = d {
                info!("Calling updater {}", args.name);
                args.update().map_err(|source| LoadError::Callback {
                    name: args.name.clone(),
                    stage,
                    source,
                })?;
            }
        }
        Ok(())
    }

    fn run_restores(&mut self, stage: Category) {
        for d in self.registry.category_mut(stage) {
            if let Descriptor::EarlyUpdater(args) | Descriptor::NormalUpdater(args) = d {
                info!("Reverting updater {}", args.name);
                args.restore();
            }
        }
    }

    fn run_overrides(&mut self) -> Result<(), LoadError> {
        if let Err(err) = self.install_overrides() {
            // A failed install undoes every active override, including ones
            // installed earlier in this same stage.
            self.interceptor.unregister_all();
            return Err(err);
        }
        Ok(())
    }

    fn install_overrides(&mut self) -> Result<(), LoadError> {
        let Self {
            registry,
            resolver,
            interceptor,
            ..
        } = self;
        for d in registry.category_mut(Category::FunctionOverride) {
            let Descriptor::FunctionOverride(args) = d else {
                continue;
            };
            info!("Installing override for {}", args.name);
            let target = match args.explicit_addr {
                Some(addr) => addr,
                None => resolver
                    .resolve(&args.name)
                    .ok_or_else(|| LoadError::SymbolNotFound(args.name.clone()))?,
            };
            interceptor.register_override(&args.name, target, args.replacement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticSymbolTable;
    use graft_intercept::SlotPatcher;

    fn empty_orchestrator() -> Orchestrator {
        Orchestrator::new(
            Registry::new(),
            Box::new(StaticSymbolTable::new()),
            Box::new(SlotPatcher::new()),
        )
    }

    #[test]
    fn empty_registry_starts_and_stops() {
        let mut orch = empty_orchestrator();
        assert_eq!(orch.state(), ModuleState::Idle);

        orch.start().unwrap();
        assert_eq!(orch.state(), ModuleState::Running);
        assert!(orch.active_hooks().is_empty());

        orch.stop();
        assert_eq!(orch.state(), ModuleState::Stopped);
    }

    #[test]
    fn stop_before_start_is_a_noop() {
        let mut orch = empty_orchestrator();
        orch.stop();
        assert_eq!(orch.state(), ModuleState::Idle);
    }

    #[test]
    fn start_is_single_shot() {
        let mut orch = empty_orchestrator();
        orch.start().unwrap();
        // Second call must not re-run bring-up or change state.
        orch.start().unwrap();
        assert_eq!(orch.state(), ModuleState::Running);
    }

    #[test]
    fn stop_after_stop_stays_stopped() {
        let mut orch = empty_orchestrator();
        orch.start().unwrap();
        orch.stop();
        orch.stop();
        assert_eq!(orch.state(), ModuleState::Stopped);
    }
}
