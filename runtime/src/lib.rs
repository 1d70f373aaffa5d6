//! graft-runtime: staged bring-up and teardown of in-process extensions.
//!
//! Independently authored extensions publish [`Descriptor`]s into a
//! [`Registry`]; the [`Orchestrator`] drives the seven lifecycle stages over
//! them in order (early inits, symbol aliases, normal inits, early updaters,
//! function overrides, normal updaters, final inits), installing overrides
//! through graft-intercept. Any stage failure unwinds the completed stages
//! in reverse and denies the load; `stop()` performs the same unwind from a
//! running state.
//!
//! ```
//! use graft_runtime::{Descriptor, Orchestrator, Registry, SlotPatcher, StaticSymbolTable};
//!
//! let mut registry = Registry::new();
//! registry.register(Descriptor::early_init(
//!     "example",
//!     || {
//!         // acquire resources
//!         Ok(())
//!     },
//!     || {
//!         // release them
//!     },
//! ));
//!
//! let mut orchestrator = Orchestrator::new(
//!     registry,
//!     Box::new(StaticSymbolTable::new()),
//!     Box::new(SlotPatcher::new()),
//! );
//! orchestrator.start()?;
//! orchestrator.stop();
//! # Ok::<(), graft_runtime::LoadError>(())
//! ```

pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod resolver;

pub use descriptor::{AliasSlot, Category, Descriptor};
pub use error::{LoadError, Result};
pub use orchestrator::{ModuleState, Orchestrator};
pub use registry::Registry;
#[cfg(unix)]
pub use resolver::ProcessSymbols;
pub use resolver::{StaticSymbolTable, SymbolResolver, SymbolSource};

// Re-exports so extensions declaring overrides don't need a direct
// graft-intercept dependency.
pub use graft_intercept::{
    DispatchSlot, HookBackend, HookError, HookHandle, InstalledHook, SlotPatcher,
};
