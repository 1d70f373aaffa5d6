//! Symbol resolution against the host's symbol service.

use std::collections::HashMap;

use log::{error, info};

use crate::descriptor::AliasDescriptor;
use crate::error::LoadError;

/// The host's symbol table, kept opaque: given a name, an address or
/// nothing.
pub trait SymbolSource: Send {
    fn resolve(&self, name: &str) -> Option<usize>;
}

/// In-memory symbol table for hosts that publish their own symbols.
#[derive(Default)]
pub struct StaticSymbolTable {
    symbols: HashMap<String, usize>,
}

impl StaticSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, addr: usize) {
        self.symbols.insert(name.into(), addr);
    }

    pub fn with(mut self, name: impl Into<String>, addr: usize) -> Self {
        self.insert(name, addr);
        self
    }
}

impl SymbolSource for StaticSymbolTable {
    fn resolve(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied()
    }
}

/// Symbols exported by the current process image, looked up through the
/// platform loader.
#[cfg(unix)]
#[derive(Default)]
pub struct ProcessSymbols;

#[cfg(unix)]
impl SymbolSource for ProcessSymbols {
    fn resolve(&self, name: &str) -> Option<usize> {
        graft_intercept::symbols::find_global_export_by_name(name)
    }
}

/// Resolves override targets and populates extension alias slots.
pub struct SymbolResolver {
    source: Box<dyn SymbolSource>,
}

impl SymbolResolver {
    pub fn new(source: Box<dyn SymbolSource>) -> Self {
        Self { source }
    }

    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.source.resolve(name)
    }

    /// Resolve the descriptor's symbol and write its alias slot.
    ///
    /// This is the sole point where an extension obtains the address of a
    /// host-internal function it needs to call directly.
    pub(crate) fn populate_alias(&self, descriptor: &AliasDescriptor) -> Result<(), LoadError> {
        match self.source.resolve(&descriptor.symbol) {
            Some(addr) => {
                info!("Assigning alias for symbol '{}'", descriptor.symbol);
                descriptor.slot.store(addr);
                Ok(())
            }
            None => {
                error!("Couldn't find symbol {}", descriptor.symbol);
                Err(LoadError::SymbolNotFound(descriptor.symbol.clone()))
            }
        }
    }
}
