//! The loading seam and its `libloading` implementation.
//!
//! All `unsafe` in the workspace is confined to [`DlBackend`]: opening a
//! shared library and calling its exported C-ABI functions is inherently
//! trusting the library. Everything above this seam is safe code, and
//! tests run against an in-process fake backend instead.

use std::path::Path;

use libloading::Library;

use crate::manager::{ModuleContext, ModuleError};

/// Exported registration function: module submits codelets and hooks
/// through the context. Returns 0 on success.
pub type RegisterFn = unsafe extern "C" fn(ctx: *mut ModuleContext) -> i32;

/// Exported dependency declaration: a NUL-terminated list of module
/// names separated by spaces or commas, or null for none.
pub type GetDepsFn = unsafe extern "C" fn() -> *const std::os::raw::c_char;

/// Exported toolbox initialiser. Returns 0 on success.
pub type InitialiseFn = unsafe extern "C" fn() -> i32;

/// Exported toolbox finaliser. Returns 0 on success.
pub type FinaliseFn = unsafe extern "C" fn() -> i32;

/// Opens module files.
pub trait LibraryBackend {
    /// Open the library at `path`. A missing file is an
    /// [`ModuleError::OpenFailed`]; candidates are probed with
    /// [`Path::exists`]-style checks by the caller where cheap.
    fn open(&self, path: &Path) -> Result<Box<dyn LoadedLibrary>, ModuleError>;
}

/// One opened module file.
pub trait LoadedLibrary {
    /// Whether the library exports `symbol`.
    fn has_symbol(&self, symbol: &str) -> bool;

    /// Call the registration function exported as `symbol`.
    fn register(&self, symbol: &str, ctx: &mut ModuleContext) -> Result<(), ModuleError>;

    /// The dependency list exported as `symbol`, if any.
    fn get_deps(&self, symbol: &str) -> Option<String>;

    /// Call the toolbox initialiser exported as `symbol`. Returns the
    /// function's status, 0 on success.
    fn initialise(&self, symbol: &str) -> Result<(), ModuleError>;

    /// Call the toolbox finaliser exported as `symbol`.
    fn finalise(&self, symbol: &str) -> Result<(), ModuleError>;
}

// ── libloading ─────────────────────────────────────────────────────────────

/// Production backend over `dlopen`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DlBackend;

impl LibraryBackend for DlBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn LoadedLibrary>, ModuleError> {
        if !path.is_file() {
            return Err(ModuleError::OpenFailed {
                path: path.to_path_buf(),
                reason: "no such file".to_owned(),
            });
        }
        let library = unsafe { Library::new(path) }.map_err(|err| ModuleError::OpenFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        log::debug!("opened module library {}", path.display());
        Ok(Box::new(DlLibrary { library }))
    }
}

struct DlLibrary {
    library: Library,
}

impl DlLibrary {
    fn symbol_bytes(symbol: &str) -> Vec<u8> {
        let mut bytes = symbol.as_bytes().to_vec();
        bytes.push(0);
        bytes
    }

    fn status(symbol: &str, status: i32) -> Result<(), ModuleError> {
        if status == 0 {
            Ok(())
        } else {
            Err(ModuleError::SymbolFailed {
                symbol: symbol.to_owned(),
                status,
            })
        }
    }
}

impl LoadedLibrary for DlLibrary {
    fn has_symbol(&self, symbol: &str) -> bool {
        let bytes = Self::symbol_bytes(symbol);
        unsafe { self.library.get::<*const ()>(&bytes) }.is_ok()
    }

    fn register(&self, symbol: &str, ctx: &mut ModuleContext) -> Result<(), ModuleError> {
        let bytes = Self::symbol_bytes(symbol);
        let func = unsafe { self.library.get::<RegisterFn>(&bytes) }.map_err(|_| {
            ModuleError::MissingSymbol {
                symbol: symbol.to_owned(),
            }
        })?;
        let status = unsafe { func(ctx as *mut ModuleContext) };
        Self::status(symbol, status)
    }

    fn get_deps(&self, symbol: &str) -> Option<String> {
        let bytes = Self::symbol_bytes(symbol);
        let func = unsafe { self.library.get::<GetDepsFn>(&bytes) }.ok()?;
        let raw = unsafe { func() };
        if raw.is_null() {
            return None;
        }
        let deps = unsafe { std::ffi::CStr::from_ptr(raw) };
        Some(deps.to_string_lossy().into_owned())
    }

    fn initialise(&self, symbol: &str) -> Result<(), ModuleError> {
        let bytes = Self::symbol_bytes(symbol);
        let func = unsafe { self.library.get::<InitialiseFn>(&bytes) }.map_err(|_| {
            ModuleError::MissingSymbol {
                symbol: symbol.to_owned(),
            }
        })?;
        let status = unsafe { func() };
        Self::status(symbol, status)
    }

    fn finalise(&self, symbol: &str) -> Result<(), ModuleError> {
        let bytes = Self::symbol_bytes(symbol);
        let func = unsafe { self.library.get::<FinaliseFn>(&bytes) }.map_err(|_| {
            ModuleError::MissingSymbol {
                symbol: symbol.to_owned(),
            }
        })?;
        let status = unsafe { func() };
        Self::status(symbol, status)
    }
}
