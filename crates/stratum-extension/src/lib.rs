//! Post-hoc extension of records with typed slots at stable offsets.
//!
//! An [`ExtensionManager`] lets plugins attach extra data to records they
//! do not own. Four shapes are supported:
//!
//! - **struct layout**: the manager is the layout authority for records
//!   allocated through it; extensions are slices at fixed offsets.
//! - **existing object**: a shadow buffer grows alongside one
//!   already-allocated object.
//! - **array**: a dedicated buffer per extension holds one slot for each
//!   of a fixed number of items.
//! - **extended array**: like array, but chained onto an inner struct
//!   layout whose final size is the item stride; handle lookups search
//!   the inner layout first.
//!
//! Offsets are word-aligned and monotonically increasing, so a handle
//! taken early stays valid as later extensions arrive. Once a manager is
//! locked down its layout is frozen; extending it afterwards is a
//! programming error and panics.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod manager;

pub use manager::{align, ExtensionManager, Handle, WORD_SIZE};
