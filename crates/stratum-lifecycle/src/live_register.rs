//! Ordered register of live component instances.
//!
//! One register holds every instance the factory creates plus any codelets
//! submitted by loaded modules. Order is insertion order and is the order
//! the whole-register phase walks use.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use stratum_core::similar_names;

use crate::component::{LifecycleError, SharedComponent};

/// How many near-miss names a failed lookup reports.
const SIMILAR_COUNT: usize = 5;

/// Ordered, name-keyed register of live components.
#[derive(Default)]
pub struct LiveComponentRegister {
    entries: RefCell<IndexMap<String, SharedComponent>>,
}

impl LiveComponentRegister {
    /// Create an empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty register already wrapped for sharing.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Add a component, returning its index.
    ///
    /// Adding a name that is already present is a silent no-op that
    /// returns the existing entry's index. Modules re-submitting a codelet
    /// rely on this being harmless.
    pub fn add(&self, component: SharedComponent) -> usize {
        let mut entries = self.entries.borrow_mut();
        if let Some(index) = entries.get_index_of(component.name()) {
            return index;
        }
        let (index, _) = entries.insert_full(component.name().to_owned(), component);
        index
    }

    /// Look up a component by name.
    pub fn get(&self, name: &str) -> Option<SharedComponent> {
        self.entries.borrow().get(name).cloned()
    }

    /// Component at `index` in insertion order.
    pub fn at(&self, index: usize) -> Option<SharedComponent> {
        self.entries
            .borrow()
            .get_index(index)
            .map(|(_, c)| c.clone())
    }

    /// Index of `name` in insertion order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.borrow().get_index_of(name)
    }

    /// Whether a component named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the register is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Snapshot of registered names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of registered components in insertion order.
    pub fn components(&self) -> Vec<SharedComponent> {
        self.entries.borrow().values().cloned().collect()
    }

    /// The registered names closest to `target`, for diagnostics.
    pub fn similar(&self, target: &str) -> Vec<String> {
        let entries = self.entries.borrow();
        similar_names(entries.keys().map(String::as_str), target, SIMILAR_COUNT)
    }

    /// Unlink an entry without destroying the component. The instance is
    /// returned alive; later entries shift down.
    pub fn remove(&self, name: &str) -> Option<SharedComponent> {
        self.entries.borrow_mut().shift_remove(name)
    }

    // ── Whole-register phase walks ─────────────────────────────────────────

    /// Build every component in insertion order, skipping any already
    /// built.
    pub fn build_all(&self, data: &mut dyn Any) -> Result<(), LifecycleError> {
        for component in self.components() {
            component.build(data, false)?;
        }
        Ok(())
    }

    /// Initialise every component in insertion order, skipping any already
    /// initialised.
    pub fn initialise_all(&self, data: &mut dyn Any) -> Result<(), LifecycleError> {
        for component in self.components() {
            component.initialise(data, false)?;
        }
        Ok(())
    }

    /// Destroy every component in insertion order. Locked and
    /// already-destroyed instances are skipped.
    pub fn destroy_all(&self) -> Result<(), LifecycleError> {
        for component in self.components() {
            component.destroy()?;
        }
        Ok(())
    }

    /// Drop all entries, last-registered first.
    pub fn delete_all(&self) {
        loop {
            let last = self.entries.borrow_mut().pop();
            if last.is_none() {
                break;
            }
        }
    }
}

impl fmt::Debug for LiveComponentRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveComponentRegister")
            .field("names", &self.entries.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
