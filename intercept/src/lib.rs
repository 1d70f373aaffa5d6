//! graft-intercept: function interception for the graft extension runtime.
//!
//! Three pieces, stacked:
//!
//! - [`patcher`]: the hook primitive, one narrow [`HookBackend`] interface
//!   over the low-level redirect mechanism, with the table-driven
//!   [`SlotPatcher`] as the built-in backend;
//! - [`interceptor`]: the engine that owns the ordered set of active hooks
//!   and bulk-removes them on teardown or partial failure;
//! - [`symbols`]: process symbol lookup via the platform loader.

pub mod interceptor;
pub mod patcher;
pub mod slot;
pub mod symbols;
pub mod types;

// Re-exports for convenience (flattened imports)
pub use interceptor::{InstalledHook, Interceptor};
pub use patcher::{HookBackend, HookHandle, SlotPatcher};
pub use slot::DispatchSlot;
pub use types::HookError;
