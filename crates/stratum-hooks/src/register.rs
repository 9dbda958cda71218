//! Name-keyed register of entry points.

use std::fmt;

use indexmap::IndexMap;

use crate::entry_point::EntryPoint;
use crate::hook::CastType;

/// Ordered register of entry points, keyed by name.
///
/// Entry points are declared by code, not configuration, so a duplicate
/// registration is a programming error and panics.
#[derive(Default)]
pub struct EntryPointRegister {
    entries: IndexMap<String, EntryPoint>,
}

impl EntryPointRegister {
    /// Create an empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry point, returning its index.
    ///
    /// # Panics
    ///
    /// Panics if an entry point with the same name is already registered.
    pub fn add(&mut self, entry_point: EntryPoint) -> usize {
        let name = entry_point.name().to_owned();
        if self.entries.contains_key(&name) {
            panic!("entry point '{name}' is already registered");
        }
        let (index, _) = self.entries.insert_full(name, entry_point);
        index
    }

    /// Declare and register an empty entry point in one step.
    pub fn declare(&mut self, name: impl Into<String>, cast_type: CastType) -> &mut EntryPoint {
        let name = name.into();
        self.add(EntryPoint::new(name.clone(), cast_type));
        self.entries.get_mut(&name).unwrap_or_else(|| {
            unreachable!("entry point registered above")
        })
    }

    /// Look up an entry point by name.
    pub fn get(&self, name: &str) -> Option<&EntryPoint> {
        self.entries.get(name)
    }

    /// Mutable lookup by name, for splicing hooks in.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut EntryPoint> {
        self.entries.get_mut(name)
    }

    /// Entry point at `index` in registration order.
    pub fn at(&self, index: usize) -> Option<&EntryPoint> {
        self.entries.get_index(index).map(|(_, ep)| ep)
    }

    /// Index of `name` in registration order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    /// Number of registered entry points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the register is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for EntryPointRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointRegister")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Hook;

    #[test]
    fn declare_then_splice() {
        let mut register = EntryPointRegister::new();
        register.declare("context.build", CastType::Void1);
        register.declare("context.solve", CastType::Void1);
        register
            .get_mut("context.solve")
            .unwrap()
            .append(Hook::void1("solver", |_| {}));
        assert_eq!(register.names(), ["context.build", "context.solve"]);
        assert_eq!(register.get("context.solve").unwrap().len(), 1);
        assert_eq!(register.index_of("context.solve"), Some(1));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut register = EntryPointRegister::new();
        register.declare("tick", CastType::Void0);
        register.declare("tick", CastType::Void0);
    }

    #[test]
    fn lookup_miss_is_none() {
        let register = EntryPointRegister::new();
        assert!(register.get("absent").is_none());
        assert!(register.at(0).is_none());
    }
}
