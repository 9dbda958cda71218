//! Data-driven component creation and wiring.
//!
//! The factory reads a root [`Dictionary`] whose `components` section maps
//! instance names to definitions:
//!
//! ```json
//! {
//!     "gravity": 9.81,
//!     "components": {
//!         "context": { "Type": "DomainContext" },
//!         "solver":  { "Type": "StokesSolver", "mesh": "linearMesh",
//!                      "tolerance": 1e-6 },
//!         "linearMesh": { "Type": "Mesh", "dim": 3 }
//!     }
//! }
//! ```
//!
//! [`create_components`](ComponentFactory::create_components) instantiates
//! every definition in two passes (context types first) without
//! constructing anything; construction then proceeds on demand as
//! components resolve their dependencies through the `construct_by_*`
//! family, or in bulk through
//! [`construct_all`](ComponentFactory::construct_all).
//!
//! Scalar parameter reads are coercing, and a string value that does not
//! look numeric is treated as a key into the root dictionary. That gives
//! input files one level of named constants: `"tolerance": "defaultTol"`
//! reads the root entry `defaultTol`.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use stratum_core::{string_is_numeric, Dictionary, JournalSettings, NullTracer, Tracer, Value};

use crate::component::{ComponentInstance, SharedComponent};
use crate::live_register::LiveComponentRegister;
use crate::registry::{ComponentRegistry, RegistryError};

/// Dictionary key of the component-definitions section.
pub const COMPONENTS_KEY: &str = "components";

/// Dictionary key naming a definition's component type.
pub const TYPE_KEY: &str = "Type";

/// Creates and wires components from a dictionary.
pub struct ComponentFactory {
    root: Dictionary,
    components: Dictionary,
    registry: Rc<ComponentRegistry>,
    register: Rc<LiveComponentRegister>,
    context_types: Vec<String>,
    tracer: Box<dyn Tracer>,
}

impl ComponentFactory {
    /// Build a factory over `root`, whose `components` entry (when
    /// present) holds the instance definitions.
    pub fn new(root: Dictionary, registry: Rc<ComponentRegistry>) -> Self {
        let components = root.get_dict(COMPONENTS_KEY).cloned().unwrap_or_default();
        Self {
            root,
            components,
            registry,
            register: LiveComponentRegister::shared(),
            context_types: vec!["DomainContext".to_owned()],
            tracer: Box::new(NullTracer),
        }
    }

    /// Replace the set of context types instantiated in the first
    /// creation pass.
    pub fn with_context_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Install a tracer bracketing construction phases.
    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Populate an existing live register instead of a fresh one, so
    /// codelets submitted by modules and components created here share
    /// one lifecycle walk.
    pub fn with_live_register(mut self, register: Rc<LiveComponentRegister>) -> Self {
        self.register = register;
        self
    }

    /// The root dictionary.
    pub fn root_dict(&self) -> &Dictionary {
        &self.root
    }

    /// The component-definitions dictionary.
    pub fn component_dict(&self) -> &Dictionary {
        &self.components
    }

    /// The live register this factory populates.
    pub fn live_register(&self) -> &Rc<LiveComponentRegister> {
        &self.register
    }

    /// The type registry this factory draws constructors from.
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    // ── Creation ───────────────────────────────────────────────────────────

    /// Instantiate every definition into the live register.
    ///
    /// Two passes in definition order: context types first, everything
    /// else second, so non-context components can assume their context
    /// exists. Nothing is constructed here.
    pub fn create_components(&self) -> Result<(), FactoryError> {
        for context_pass in [true, false] {
            for (name, value) in self.components.iter() {
                let definition =
                    value
                        .as_dict()
                        .ok_or_else(|| FactoryError::InvalidDefinition {
                            name: name.to_owned(),
                        })?;
                let type_name = definition.get_string(TYPE_KEY, "");
                if type_name.is_empty() {
                    return Err(FactoryError::MissingType {
                        name: name.to_owned(),
                    });
                }
                let is_context = self.context_types.iter().any(|t| t == &type_name);
                if is_context != context_pass {
                    continue;
                }
                if self.register.contains(name) {
                    return Err(FactoryError::DuplicateName {
                        name: name.to_owned(),
                    });
                }
                let entry = self.registry.assert_get(&type_name)?;
                log::debug!("instantiating '{name}' as {type_name}");
                let component = (entry.constructor)(name);
                self.register
                    .add(ComponentInstance::shared(name, entry.type_name, component));
            }
        }
        Ok(())
    }

    /// Construct every registered component in register order, skipping
    /// any already constructed.
    pub fn construct_all(&self, data: &mut dyn Any) -> Result<(), FactoryError> {
        for component in self.register.components() {
            self.construct_instance(&component, false, data)?;
        }
        Ok(())
    }

    /// Drive one instance's construct phase, applying its journal
    /// settings first.
    pub fn construct_instance(
        &self,
        instance: &SharedComponent,
        force: bool,
        data: &mut dyn Any,
    ) -> Result<(), FactoryError> {
        if instance.is_constructed() && !force {
            return Ok(());
        }
        if let Some(definition) = self.components.get_dict(instance.name()) {
            JournalSettings::from_dictionary(definition).apply(instance.name());
        }
        let span = format!("construct:{}", instance.name());
        self.tracer.enter(&span);
        let result = instance.construct(self, data, force);
        self.tracer.exit(&span);
        result
    }

    // ── Dependency wiring ──────────────────────────────────────────────────

    /// Fetch the component named `name`, constructing it first if needed,
    /// and check it can stand in for `type_name`.
    ///
    /// When `name` is not registered but the root dictionary holds a
    /// non-empty string under it, that string is followed as a redirect,
    /// once. A miss is an error only when `essential`; otherwise it logs
    /// and yields `None`.
    pub fn construct_by_name(
        &self,
        name: &str,
        type_name: &str,
        essential: bool,
        data: &mut dyn Any,
    ) -> Result<Option<SharedComponent>, FactoryError> {
        let (resolved, found) = self.lookup_with_redirect(name);
        let Some(instance) = found else {
            if essential {
                return Err(FactoryError::NotFound {
                    name: resolved,
                    similar: self.register.similar(name),
                });
            }
            log::warn!("non-essential component '{resolved}' not found; continuing without it");
            return Ok(None);
        };
        if !instance.is_constructed() {
            self.construct_instance(&instance, true, data)?;
        }
        if !instance.is_a(type_name) {
            return Err(FactoryError::TypeMismatch {
                name: resolved,
                expected: type_name.to_owned(),
                actual: instance.type_name().to_owned(),
            });
        }
        Ok(Some(instance))
    }

    /// Resolve a dependency named by `key` in `parent`'s definition, then
    /// construct it as [`construct_by_name`](Self::construct_by_name)
    /// would.
    pub fn construct_by_key(
        &self,
        parent: &str,
        key: &str,
        type_name: &str,
        essential: bool,
        data: &mut dyn Any,
    ) -> Result<Option<SharedComponent>, FactoryError> {
        let target = self
            .components
            .get_dict(parent)
            .and_then(|d| d.try_string(key));
        let Some(target) = target.filter(|t| !t.is_empty()) else {
            if essential {
                return Err(FactoryError::MissingKey {
                    parent: parent.to_owned(),
                    key: key.to_owned(),
                });
            }
            log::warn!("'{parent}' has no '{key}' entry; continuing without it");
            return Ok(None);
        };
        self.construct_by_name(&target, type_name, essential, data)
    }

    /// Try the literal `trial_name` first with no complaint on a miss,
    /// then fall back to the `key` entry in `parent`'s definition.
    pub fn construct_by_name_with_key_fallback(
        &self,
        parent: &str,
        trial_name: &str,
        key: &str,
        type_name: &str,
        essential: bool,
        data: &mut dyn Any,
    ) -> Result<Option<SharedComponent>, FactoryError> {
        let (_, found) = self.lookup_with_redirect(trial_name);
        if found.is_some() {
            return self.construct_by_name(trial_name, type_name, false, data);
        }
        self.construct_by_key(parent, key, type_name, essential, data)
    }

    /// Construct every component named in the list under `key` in
    /// `parent`'s definition, capped at `max` entries. Each listed name is
    /// required to resolve.
    pub fn construct_by_list(
        &self,
        parent: &str,
        key: &str,
        type_name: &str,
        max: usize,
        essential: bool,
        data: &mut dyn Any,
    ) -> Result<Vec<SharedComponent>, FactoryError> {
        let definition = self.components.get_dict(parent);
        let Some(items) = definition.and_then(|d| d.get_list(key)) else {
            if essential {
                return Err(FactoryError::MissingList {
                    parent: parent.to_owned(),
                    key: key.to_owned(),
                });
            }
            log::warn!("'{parent}' has no '{key}' list; continuing without it");
            return Ok(Vec::new());
        };
        let count = items.len().min(max);
        let mut out = Vec::with_capacity(count);
        for (index, item) in items.iter().take(count).enumerate() {
            let name = item.as_str().ok_or_else(|| FactoryError::BadListEntry {
                parent: parent.to_owned(),
                key: key.to_owned(),
                index,
            })?;
            match self.construct_by_name(name, type_name, true, data)? {
                Some(component) => out.push(component),
                // essential construction either errors or yields a component
                None => unreachable!("essential construct_by_name returned None"),
            }
        }
        Ok(out)
    }

    fn lookup_with_redirect(&self, name: &str) -> (String, Option<SharedComponent>) {
        if let Some(component) = self.register.get(name) {
            return (name.to_owned(), Some(component));
        }
        // one level of aliasing through the root dictionary
        if let Some(redirect) = self
            .root
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            log::debug!("redirecting component lookup '{name}' -> '{redirect}'");
            return (redirect.to_owned(), self.register.get(redirect));
        }
        (name.to_owned(), None)
    }

    // ── Scalar parameters ──────────────────────────────────────────────────

    /// Double under `key` in `parent`'s definition, or `default`.
    pub fn get_double(&self, parent: &str, key: &str, default: f64) -> f64 {
        self.try_double(parent, key).unwrap_or(default)
    }

    /// Signed integer under `key` in `parent`'s definition, or `default`.
    pub fn get_int(&self, parent: &str, key: &str, default: i64) -> i64 {
        self.try_int(parent, key).unwrap_or(default)
    }

    /// Unsigned integer under `key` in `parent`'s definition, or
    /// `default`.
    pub fn get_uint(&self, parent: &str, key: &str, default: u64) -> u64 {
        self.try_uint(parent, key).unwrap_or(default)
    }

    /// Boolean under `key` in `parent`'s definition, or `default`.
    pub fn get_bool(&self, parent: &str, key: &str, default: bool) -> bool {
        self.try_bool(parent, key).unwrap_or(default)
    }

    /// String under `key` in `parent`'s definition, or `default`.
    pub fn get_string(&self, parent: &str, key: &str, default: &str) -> String {
        self.try_string(parent, key)
            .unwrap_or_else(|| default.to_owned())
    }

    /// Double under `key`, if present and coercible after indirection.
    pub fn try_double(&self, parent: &str, key: &str) -> Option<f64> {
        self.numeric_param(parent, key).and_then(Value::as_double)
    }

    /// Signed integer under `key`, if present and coercible after
    /// indirection.
    pub fn try_int(&self, parent: &str, key: &str) -> Option<i64> {
        self.numeric_param(parent, key).and_then(Value::as_int)
    }

    /// Unsigned integer under `key`, if present and coercible after
    /// indirection.
    pub fn try_uint(&self, parent: &str, key: &str) -> Option<u64> {
        self.numeric_param(parent, key).and_then(Value::as_uint)
    }

    /// Boolean under `key`, if present and coercible after indirection.
    pub fn try_bool(&self, parent: &str, key: &str) -> Option<bool> {
        let value = self.param(parent, key)?;
        if value.as_bool().is_none() {
            // a non-literal string names a root entry
            if let Some(redirected) = value.as_str().and_then(|s| self.root.get(s)) {
                return redirected.as_bool();
            }
        }
        value.as_bool()
    }

    /// String under `key`, if present.
    pub fn try_string(&self, parent: &str, key: &str) -> Option<String> {
        self.param(parent, key)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    /// String under `key`, required: missing entries are configuration
    /// errors.
    pub fn get_required_string(&self, parent: &str, key: &str) -> Result<String, FactoryError> {
        self.try_string(parent, key)
            .ok_or_else(|| FactoryError::MissingKey {
                parent: parent.to_owned(),
                key: key.to_owned(),
            })
    }

    fn param(&self, parent: &str, key: &str) -> Option<&Value> {
        self.components.get_dict(parent).and_then(|d| d.get(key))
    }

    /// A parameter value with root-dictionary indirection applied: a
    /// string that does not look numeric is followed into the root
    /// dictionary, one level only.
    fn numeric_param(&self, parent: &str, key: &str) -> Option<&Value> {
        let value = self.param(parent, key)?;
        if let Value::String(s) = value {
            if !string_is_numeric(s) {
                return self.root.get(s);
            }
        }
        Some(value)
    }

    // ── Root-dictionary parameters ─────────────────────────────────────────

    /// Double directly under `key` in the root dictionary, or `default`.
    pub fn get_root_dict_double(&self, key: &str, default: f64) -> f64 {
        self.root.get_double(key, default)
    }

    /// Signed integer directly under `key` in the root dictionary, or
    /// `default`.
    pub fn get_root_dict_int(&self, key: &str, default: i64) -> i64 {
        self.root.get_int(key, default)
    }

    /// Unsigned integer directly under `key` in the root dictionary, or
    /// `default`.
    pub fn get_root_dict_uint(&self, key: &str, default: u64) -> u64 {
        self.root.get_uint(key, default)
    }

    /// Boolean directly under `key` in the root dictionary, or `default`.
    pub fn get_root_dict_bool(&self, key: &str, default: bool) -> bool {
        self.root.get_bool(key, default)
    }

    /// String directly under `key` in the root dictionary, or `default`.
    pub fn get_root_dict_string(&self, key: &str, default: &str) -> String {
        self.root.get_string(key, default)
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("definitions", &self.components.len())
            .field("live", &self.register.len())
            .field("context_types", &self.context_types)
            .finish()
    }
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// Errors from data-driven component creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FactoryError {
    /// A definition entry is not a dictionary.
    InvalidDefinition {
        /// The offending instance name.
        name: String,
    },
    /// A definition has no `Type` entry, or an empty one.
    MissingType {
        /// The offending instance name.
        name: String,
    },
    /// Two definitions (or a definition and a submitted codelet) share an
    /// instance name.
    DuplicateName {
        /// The contested instance name.
        name: String,
    },
    /// The type registry rejected a lookup or registration.
    Registry(RegistryError),
    /// An essential component is not in the live register.
    NotFound {
        /// The requested (post-redirect) instance name.
        name: String,
        /// The closest live names, best first.
        similar: Vec<String>,
    },
    /// A resolved component cannot stand in for the requested type.
    TypeMismatch {
        /// The resolved instance name.
        name: String,
        /// The type the caller asked for.
        expected: String,
        /// The instance's registered type.
        actual: String,
    },
    /// An essential key is missing from a definition.
    MissingKey {
        /// The definition looked in.
        parent: String,
        /// The missing key.
        key: String,
    },
    /// An essential list is missing from a definition.
    MissingList {
        /// The definition looked in.
        parent: String,
        /// The missing list key.
        key: String,
    },
    /// A list entry that should name a component is not a string.
    BadListEntry {
        /// The definition looked in.
        parent: String,
        /// The list key.
        key: String,
        /// Index of the bad entry.
        index: usize,
    },
    /// A component's construct callback reported a failure of its own.
    ConstructFailed {
        /// Instance name.
        name: String,
        /// The component's reported reason.
        reason: String,
    },
    /// Construct was forced on an instance whose construct callback is
    /// still running.
    ConstructionCycle {
        /// Instance name.
        name: String,
    },
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDefinition { name } => {
                write!(f, "component definition '{name}' is not a dictionary")
            }
            Self::MissingType { name } => {
                write!(f, "component definition '{name}' has no Type")
            }
            Self::DuplicateName { name } => {
                write!(f, "a component named '{name}' already exists")
            }
            Self::Registry(err) => err.fmt(f),
            Self::NotFound { name, similar } => {
                write!(f, "essential component '{name}' not found")?;
                if !similar.is_empty() {
                    write!(
                        f,
                        "; could you have meant one of these? {}",
                        similar.join(", ")
                    )?;
                }
                Ok(())
            }
            Self::TypeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "component '{name}' is a {actual}, which cannot stand in for {expected}"
            ),
            Self::MissingKey { parent, key } => {
                write!(f, "'{parent}' has no essential entry '{key}'")
            }
            Self::MissingList { parent, key } => {
                write!(f, "'{parent}' has no essential list '{key}'")
            }
            Self::BadListEntry { parent, key, index } => write!(
                f,
                "entry {index} of list '{key}' in '{parent}' is not a component name"
            ),
            Self::ConstructFailed { name, reason } => {
                write!(f, "component '{name}' failed to construct: {reason}")
            }
            Self::ConstructionCycle { name } => write!(
                f,
                "construct forced on '{name}' while its construct callback is running"
            ),
        }
    }
}

impl Error for FactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for FactoryError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}
