//! Type-name to constructor registry.
//!
//! Core types register at startup; plugins and toolboxes submit more at
//! load time, which is why mutation goes through `&self`. Registration
//! order is preserved for diagnostics.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use stratum_core::similar_names;

use crate::component::Component;

/// How many near-miss names a failed lookup reports.
const SIMILAR_COUNT: usize = 5;

/// Version string used when a registration does not supply one.
pub const DEFAULT_VERSION: &str = "0";

/// Default constructor for a component type. The argument is the instance
/// name being created.
pub type Constructor = fn(name: &str) -> Box<dyn Component>;

/// One registered component type.
#[derive(Clone)]
pub struct RegistryEntry {
    /// The registered type name.
    pub type_name: String,
    /// Version of the registering code.
    pub version: String,
    /// Default constructor.
    pub constructor: Constructor,
}

impl fmt::Debug for RegistryEntry {
    // the constructor is a bare fn pointer; its address is noise
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("type_name", &self.type_name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Registry of component types available for data-driven creation.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: RefCell<IndexMap<String, RegistryEntry>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry already wrapped for sharing.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Register a component type.
    ///
    /// Two registrations under one type name indicate two different
    /// codebases claiming the same type, so the duplicate is rejected
    /// rather than silently replacing the first.
    pub fn add(
        &self,
        type_name: impl Into<String>,
        version: impl Into<String>,
        constructor: Constructor,
    ) -> Result<(), RegistryError> {
        let type_name = type_name.into();
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&type_name) {
            return Err(RegistryError::DuplicateType { type_name });
        }
        entries.insert(
            type_name.clone(),
            RegistryEntry {
                type_name,
                version: version.into(),
                constructor,
            },
        );
        Ok(())
    }

    /// Soft lookup by type name.
    pub fn get(&self, type_name: &str) -> Option<RegistryEntry> {
        self.entries.borrow().get(type_name).cloned()
    }

    /// Lookup that treats a miss as a configuration error, reporting the
    /// closest registered names.
    pub fn assert_get(&self, type_name: &str) -> Result<RegistryEntry, RegistryError> {
        self.get(type_name).ok_or_else(|| {
            let entries = self.entries.borrow();
            RegistryError::UnknownType {
                type_name: type_name.to_owned(),
                similar: similar_names(
                    entries.keys().map(String::as_str),
                    type_name,
                    SIMILAR_COUNT,
                ),
            }
        })
    }

    /// Whether `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.borrow().contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Snapshot of all entries in registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.borrow().values().cloned().collect()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.entries.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Errors from the type registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A second registration arrived under an existing type name.
    DuplicateType {
        /// The contested type name.
        type_name: String,
    },
    /// No constructor is registered for the requested type.
    UnknownType {
        /// The requested type name.
        type_name: String,
        /// The closest registered names, best first.
        similar: Vec<String>,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateType { type_name } => {
                write!(f, "component type '{type_name}' is already registered")
            }
            Self::UnknownType { type_name, similar } => {
                write!(
                    f,
                    "cannot find default constructor function for type '{type_name}'"
                )?;
                if !similar.is_empty() {
                    write!(
                        f,
                        "; could you have meant one of these? {}",
                        similar.join(", ")
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl Error for RegistryError {}
