//! Module kinds and their file and symbol conventions.

use std::fmt;

use crate::backend::LoadedLibrary;

/// The two kinds of loadable module.
///
/// Plugins extend one model: their codelets join the live component
/// register and get constructed with everything else. Toolboxes extend
/// the framework itself: they are initialised once when loaded, their
/// codelets stay off the live register, and they are finalised at unload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    /// Model-level extension.
    Plugin,
    /// Framework-level extension.
    Toolbox,
}

impl ModuleKind {
    /// Dictionary key listing modules of this kind.
    pub fn list_key(self) -> &'static str {
        match self {
            ModuleKind::Plugin => "plugins",
            ModuleKind::Toolbox => "import",
        }
    }

    /// The symbol suffixes a module of this kind must export.
    pub fn mandatory_suffixes(self) -> &'static [&'static str] {
        match self {
            ModuleKind::Plugin => &["_Register"],
            ModuleKind::Toolbox => &["_Register", "_Initialise", "_Finalise"],
        }
    }

    /// The on-disk and symbol-root spelling of a module named `name`.
    ///
    /// Plugins keep the requested name; toolboxes append a fixed suffix,
    /// so the toolbox `Solvers` lives in `libSolversToolboxmodule.*` and
    /// exports `SolversToolbox_Register`.
    pub fn mangled_name(self, name: &str) -> String {
        match self {
            ModuleKind::Plugin => name.to_owned(),
            ModuleKind::Toolbox => format!("{name}Toolbox"),
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Plugin => f.write_str("plugin"),
            ModuleKind::Toolbox => f.write_str("toolbox"),
        }
    }
}

/// File names a module may live under, most specific first. `name` is the
/// kind-mangled spelling from [`ModuleKind::mangled_name`].
pub fn filename_candidates(name: &str) -> Vec<String> {
    let ext = std::env::consts::DLL_EXTENSION;
    vec![
        format!("lib{name}module.{ext}"),
        format!("{name}module.{ext}"),
    ]
}

/// Resolve `symbol` in `library`, falling back to an underscore-prefixed
/// spelling for platforms that mangle exported names.
pub fn resolve_symbol(library: &dyn LoadedLibrary, symbol: &str) -> Option<String> {
    if library.has_symbol(symbol) {
        return Some(symbol.to_owned());
    }
    let mangled = format!("_{symbol}");
    if library.has_symbol(&mangled) {
        return Some(mangled);
    }
    None
}

/// Judge what kind of module `library` is from the symbols the mangled
/// `name` would export, or `None` if it is not a module at all.
///
/// This is a soft check: callers probing a library that turns out to be
/// the wrong kind simply move on.
pub fn probe_kind(library: &dyn LoadedLibrary, name: &str) -> Option<ModuleKind> {
    let has = |suffix: &str| resolve_symbol(library, &format!("{name}{suffix}")).is_some();
    if !has("_Register") {
        return None;
    }
    if has("_Initialise") && has("_Finalise") {
        Some(ModuleKind::Toolbox)
    } else {
        Some(ModuleKind::Plugin)
    }
}
