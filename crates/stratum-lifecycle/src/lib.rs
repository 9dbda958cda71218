//! Component lifecycle runtime: registry, live register, and factory.
//!
//! Everything a data-driven simulation needs to go from a parsed
//! [`Dictionary`](stratum_core::Dictionary) to a population of live,
//! constructed components:
//!
//! ```text
//! ComponentRegistry          type name → default constructor
//!         │
//! ComponentFactory           two-pass creation, by-name/by-key wiring,
//!         │                  scalar parameters with root indirection
//! LiveComponentRegister      ordered live instances
//!         │
//! ComponentInstance          five-phase state machine per instance
//! ```
//!
//! # Phases
//!
//! Every component moves through construct, build, initialise, execute,
//! and destroy. The first three record their completion flag *before*
//! running the callback, so a component that triggers construction of a
//! dependency which points back at it does not recurse forever; execute
//! records completion after a successful run; destroy is skipped for
//! locked instances.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod component;
pub mod factory;
pub mod live_register;
pub mod registry;

pub use component::{
    AsAny, Component, ComponentInstance, LifecycleError, Phase, PhaseError, SharedComponent,
};
pub use factory::{ComponentFactory, FactoryError};
pub use live_register::LiveComponentRegister;
pub use registry::{ComponentRegistry, Constructor, RegistryEntry, RegistryError, DEFAULT_VERSION};
