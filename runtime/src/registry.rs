//! The extension registry: every descriptor contributed by registered
//! extensions, partitioned into the seven categories.
//!
//! Extensions publish descriptors with [`Registry::register`] before the
//! orchestrator's `start()` runs; once the orchestrator takes ownership the
//! collection is never added to again. Iteration order within a category is
//! registration order.

use log::debug;

use crate::descriptor::{Category, Descriptor};

#[derive(Default)]
pub struct Registry {
    descriptors: [Vec<Descriptor>; 7],
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a descriptor. Its variant determines its category; the
    /// membership is fixed for the life of the process.
    pub fn register(&mut self, descriptor: Descriptor) {
        let category = descriptor.category();
        debug!("Registering {} descriptor {}", category, descriptor.name());
        self.descriptors[category.index()].push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, category: Category) -> usize {
        self.descriptors[category.index()].len()
    }

    pub fn descriptors(&self, category: Category) -> &[Descriptor] {
        &self.descriptors[category.index()]
    }

    pub(crate) fn category_mut(&mut self, category: Category) -> &mut [Descriptor] {
        &mut self.descriptors[category.index()]
    }
}
