//! Entry points: named, ordered lists of hooks with typed calling
//! conventions.
//!
//! An [`EntryPoint`] is an extension seam. Core code declares one and runs
//! it at a well-known moment; components and plugins splice hooks into its
//! list to participate. Order is explicit: hooks run in list order, and the
//! list supports positional insertion plus two pinned slots (always-first
//! and always-last) that later insertions cannot displace.
//!
//! The calling convention of an entry point is fixed at creation by its
//! [`CastType`]; every hook added must match it. Mutating the list in ways
//! that violate the pin rules is a programming error and panics.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod entry_point;
pub mod hook;
pub mod register;

pub use entry_point::{EntryPoint, EntryPointError};
pub use hook::{CastType, Hook, HookFn};
pub use register::EntryPointRegister;
