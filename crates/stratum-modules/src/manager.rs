//! The modules manager: discovery, dependency resolution, registration.

use std::any::Any;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use stratum_core::Dictionary;
use stratum_hooks::EntryPointRegister;
use stratum_lifecycle::{
    ComponentFactory, ComponentInstance, ComponentRegistry, Constructor, FactoryError,
    LiveComponentRegister, RegistryError, SharedComponent,
};

use crate::backend::{LibraryBackend, LoadedLibrary};
use crate::environment::ModuleEnvironment;
use crate::module::{filename_candidates, probe_kind, resolve_symbol, ModuleKind};

/// Everything a module's registration function may touch.
///
/// Passed by pointer into the module's `Register` export; the module
/// submits codelet types and splices hooks through it.
pub struct ModuleContext {
    kind: ModuleKind,
    module_name: String,
    registry: Rc<ComponentRegistry>,
    live_register: Rc<LiveComponentRegister>,
    entry_points: Rc<RefCell<EntryPointRegister>>,
    codelets: Vec<SharedComponent>,
}

impl ModuleContext {
    /// Name of the module being registered.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// The component type registry.
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    /// The entry point register, for splicing hooks.
    pub fn entry_points(&self) -> &Rc<RefCell<EntryPointRegister>> {
        &self.entry_points
    }

    /// Submit a codelet type and instantiate one codelet for the loading
    /// manager.
    ///
    /// Registers the type unless some earlier module already did. The
    /// codelet instance joins the live component register so it is
    /// constructed with everything else, except under a toolbox manager:
    /// toolboxes extend the framework, not the model.
    pub fn submit(
        &mut self,
        type_name: &str,
        version: &str,
        constructor: Constructor,
    ) -> Result<SharedComponent, ModuleError> {
        if !self.registry.contains(type_name) {
            self.registry.add(type_name, version, constructor)?;
        }
        let entry = self.registry.assert_get(type_name)?;
        let codelet =
            ComponentInstance::shared(type_name, entry.type_name, (entry.constructor)(type_name));
        if self.kind != ModuleKind::Toolbox {
            self.live_register.add(codelet.clone());
        }
        self.codelets.push(codelet.clone());
        Ok(codelet)
    }
}

struct LoadedModule {
    name: String,
    path: PathBuf,
    library: Box<dyn LoadedLibrary>,
}

/// Loads modules of one kind and tracks them for reverse-order unload.
pub struct ModulesManager {
    kind: ModuleKind,
    env: ModuleEnvironment,
    backend: Box<dyn LibraryBackend>,
    registry: Rc<ComponentRegistry>,
    live_register: Rc<LiveComponentRegister>,
    entry_points: Rc<RefCell<EntryPointRegister>>,
    modules: Vec<LoadedModule>,
    codelets: Vec<SharedComponent>,
}

impl ModulesManager {
    /// Create a manager for modules of `kind`.
    pub fn new(
        kind: ModuleKind,
        backend: Box<dyn LibraryBackend>,
        registry: Rc<ComponentRegistry>,
        live_register: Rc<LiveComponentRegister>,
        entry_points: Rc<RefCell<EntryPointRegister>>,
    ) -> Self {
        Self {
            kind,
            env: ModuleEnvironment::new(),
            backend,
            registry,
            live_register,
            entry_points,
            modules: Vec::new(),
            codelets: Vec::new(),
        }
    }

    /// Which kind of module this manager loads.
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// The search path.
    pub fn environment(&self) -> &ModuleEnvironment {
        &self.env
    }

    /// Mutable search path, for adding directories up front.
    pub fn environment_mut(&mut self) -> &mut ModuleEnvironment {
        &mut self.env
    }

    /// Names of loaded modules in load order.
    pub fn loaded_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Whether `name` is already loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Codelets submitted by loaded modules, in submission order.
    pub fn codelets(&self) -> &[SharedComponent] {
        &self.codelets
    }

    /// Load every module the dictionary asks for.
    ///
    /// Extends the search path from the dictionary's search-path list,
    /// reads this kind's module list (`plugins` entries may carry a
    /// `Context` that must match `context_name`; `import` entries are
    /// plain names), and loads each entry.
    pub fn load(&mut self, dict: &Dictionary, context_name: &str) -> Result<(), ModuleError> {
        self.env.load_directories_from(dict);
        for name in self.module_names_from(dict, context_name)? {
            self.load_module(&name)?;
        }
        Ok(())
    }

    fn module_names_from(
        &self,
        dict: &Dictionary,
        context_name: &str,
    ) -> Result<Vec<String>, ModuleError> {
        let key = self.kind.list_key();
        let Some(items) = dict.get_list(key) else {
            log::debug!("no '{key}' list; nothing to load");
            return Ok(Vec::new());
        };
        let mut names = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if let Some(name) = item.as_str() {
                names.push(name.to_owned());
                continue;
            }
            let Some(entry) = item.as_dict() else {
                return Err(ModuleError::BadEntry {
                    key: key.to_owned(),
                    index,
                });
            };
            let Some(name) = entry.try_string("Type") else {
                return Err(ModuleError::BadEntry {
                    key: key.to_owned(),
                    index,
                });
            };
            if let Some(wanted) = entry.try_string("Context") {
                if wanted != context_name {
                    log::debug!("skipping '{name}': bound to context '{wanted}'");
                    continue;
                }
            }
            names.push(name);
        }
        Ok(names)
    }

    /// Load one module by name. Loading a module that is already loaded
    /// succeeds without doing anything.
    ///
    /// Declared dependencies load first, recursively; a dependency
    /// failure abandons the module.
    pub fn load_module(&mut self, name: &str) -> Result<(), ModuleError> {
        if self.is_loaded(name) {
            return Ok(());
        }
        let mangled = self.kind.mangled_name(name);
        let (path, library) = self.open_module(name, &mangled)?;

        match probe_kind(library.as_ref(), &mangled) {
            Some(kind) if kind == self.kind => {}
            Some(found) => {
                return Err(ModuleError::WrongKind {
                    name: name.to_owned(),
                    expected: self.kind,
                    found,
                })
            }
            None => {
                return Err(ModuleError::MissingSymbol {
                    symbol: format!("{mangled}_Register"),
                })
            }
        }

        if let Some(symbol) = resolve_symbol(library.as_ref(), &format!("{mangled}_GetDeps")) {
            if let Some(deps) = library.get_deps(&symbol) {
                for dep in deps
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|s| !s.is_empty())
                {
                    if let Err(err) = self.load_module(dep) {
                        return Err(ModuleError::DependencyFailed {
                            module: name.to_owned(),
                            dependency: dep.to_owned(),
                            source: Box::new(err),
                        });
                    }
                }
            }
        }

        // toolboxes come up before their Register may lean on them
        if self.kind == ModuleKind::Toolbox {
            let symbol = resolve_symbol(library.as_ref(), &format!("{mangled}_Initialise"))
                .ok_or_else(|| ModuleError::MissingSymbol {
                    symbol: format!("{mangled}_Initialise"),
                })?;
            library.initialise(&symbol)?;
        }

        let register_symbol = resolve_symbol(library.as_ref(), &format!("{mangled}_Register"))
            .ok_or_else(|| ModuleError::MissingSymbol {
                symbol: format!("{mangled}_Register"),
            })?;
        let mut ctx = ModuleContext {
            kind: self.kind,
            module_name: name.to_owned(),
            registry: self.registry.clone(),
            live_register: self.live_register.clone(),
            entry_points: self.entry_points.clone(),
            codelets: Vec::new(),
        };
        library.register(&register_symbol, &mut ctx)?;
        self.codelets.append(&mut ctx.codelets);

        log::info!("loaded {} '{name}' from {}", self.kind, path.display());
        self.modules.push(LoadedModule {
            name: name.to_owned(),
            path,
            library,
        });
        Ok(())
    }

    fn open_module(
        &self,
        name: &str,
        mangled: &str,
    ) -> Result<(PathBuf, Box<dyn LoadedLibrary>), ModuleError> {
        let mut searched = Vec::new();
        for dir in self.env.directories() {
            for file in filename_candidates(mangled) {
                let path = dir.join(&file);
                match self.backend.open(&path) {
                    Ok(library) => return Ok((path, library)),
                    Err(err) => {
                        log::debug!("candidate {} rejected: {err}", path.display());
                        searched.push(path);
                    }
                }
            }
        }
        Err(ModuleError::NotFound {
            name: name.to_owned(),
            searched,
        })
    }

    /// Construct every submitted codelet through the factory, skipping
    /// any already constructed.
    pub fn construct_codelets(
        &self,
        cf: &ComponentFactory,
        data: &mut dyn Any,
    ) -> Result<(), FactoryError> {
        for codelet in &self.codelets {
            cf.construct_instance(codelet, false, data)?;
        }
        Ok(())
    }

    /// Unload every module in reverse load order. Toolboxes run their
    /// finaliser on the way out.
    pub fn unload(&mut self) -> Result<(), ModuleError> {
        while let Some(module) = self.modules.pop() {
            if self.kind == ModuleKind::Toolbox {
                let mangled = self.kind.mangled_name(&module.name);
                if let Some(symbol) =
                    resolve_symbol(module.library.as_ref(), &format!("{mangled}_Finalise"))
                {
                    module.library.finalise(&symbol)?;
                }
            }
            log::debug!("unloaded {} '{}'", self.kind, module.name);
        }
        Ok(())
    }
}

impl Drop for ModulesManager {
    fn drop(&mut self) {
        if let Err(err) = self.unload() {
            log::warn!("unload during drop failed: {err}");
        }
    }
}

impl fmt::Debug for ModulesManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModulesManager")
            .field("kind", &self.kind)
            .field("loaded", &self.loaded_names())
            .field("codelets", &self.codelets.len())
            .finish()
    }
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// Errors from module loading.
#[derive(Debug)]
pub enum ModuleError {
    /// No candidate file opened in any search directory.
    NotFound {
        /// The requested module name.
        name: String,
        /// Every path that was tried.
        searched: Vec<PathBuf>,
    },
    /// A specific file failed to open.
    OpenFailed {
        /// The file.
        path: PathBuf,
        /// Loader-reported reason.
        reason: String,
    },
    /// A mandatory symbol is absent, underscore fallback included.
    MissingSymbol {
        /// The symbol looked for.
        symbol: String,
    },
    /// The file is a module, but not this manager's kind.
    WrongKind {
        /// The requested module name.
        name: String,
        /// The kind this manager loads.
        expected: ModuleKind,
        /// The kind the file turned out to be.
        found: ModuleKind,
    },
    /// An exported function returned a nonzero status.
    SymbolFailed {
        /// The symbol called.
        symbol: String,
        /// Its return status.
        status: i32,
    },
    /// A declared dependency failed to load.
    DependencyFailed {
        /// The module declaring the dependency.
        module: String,
        /// The dependency that failed.
        dependency: String,
        /// Why it failed.
        source: Box<ModuleError>,
    },
    /// A module-list entry is neither a name nor a definition with a
    /// `Type`.
    BadEntry {
        /// The dictionary list key.
        key: String,
        /// Index of the offending entry.
        index: usize,
    },
    /// Codelet submission collided in the type registry.
    Registry(RegistryError),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name, searched } => {
                write!(f, "module '{name}' not found; searched ")?;
                let paths: Vec<_> = searched.iter().map(|p| p.display().to_string()).collect();
                f.write_str(&paths.join(", "))
            }
            Self::OpenFailed { path, reason } => {
                write!(f, "cannot open {}: {reason}", path.display())
            }
            Self::MissingSymbol { symbol } => {
                write!(f, "module does not export '{symbol}'")
            }
            Self::WrongKind {
                name,
                expected,
                found,
            } => write!(f, "module '{name}' is a {found}, expected a {expected}"),
            Self::SymbolFailed { symbol, status } => {
                write!(f, "'{symbol}' returned status {status}")
            }
            Self::DependencyFailed {
                module,
                dependency,
                source,
            } => write!(
                f,
                "module '{module}' dependency '{dependency}' failed: {source}"
            ),
            Self::BadEntry { key, index } => {
                write!(f, "entry {index} of '{key}' names no module")
            }
            Self::Registry(err) => err.fmt(f),
        }
    }
}

impl Error for ModuleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DependencyFailed { source, .. } => Some(source),
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for ModuleError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}
