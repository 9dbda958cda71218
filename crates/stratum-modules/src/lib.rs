//! Dynamic loading of plugins and toolboxes.
//!
//! A module is a shared library following a symbol convention: module
//! `Foo` exports `Foo_Register`, optionally `Foo_GetDeps`, and (for
//! toolboxes) `Foo_Initialise` / `Foo_Finalise`. The
//! [`ModulesManager`] finds module files on a search path, loads their
//! declared dependencies first, and invokes `Register`, through which the
//! module submits codelet types to the component registry and splices
//! hooks into entry points.
//!
//! Loading goes through the [`LibraryBackend`] seam. Production code uses
//! [`DlBackend`] (the only `unsafe` in the workspace lives there); tests
//! substitute an in-process fake so no test dlopens anything.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

#[allow(unsafe_code)]
pub mod backend;
pub mod environment;
pub mod manager;
pub mod module;

pub use backend::{DlBackend, LibraryBackend, LoadedLibrary};
pub use environment::{ModuleEnvironment, SEARCH_PATH_KEY};
pub use manager::{ModuleContext, ModuleError, ModulesManager};
pub use module::{probe_kind, ModuleKind};
