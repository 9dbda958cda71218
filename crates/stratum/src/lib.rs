//! Stratum: a component lifecycle runtime for data-driven simulation
//! frameworks.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Stratum sub-crates. For most users, adding `stratum` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::any::Any;
//! use stratum::prelude::*;
//!
//! // A component that reads one parameter at construct time.
//! struct Diffusion {
//!     rate: f64,
//! }
//!
//! impl Component for Diffusion {
//!     fn type_name(&self) -> &str {
//!         "Diffusion"
//!     }
//!     fn construct(
//!         &mut self,
//!         cf: &ComponentFactory,
//!         _data: &mut dyn Any,
//!     ) -> Result<(), FactoryError> {
//!         self.rate = cf.get_double("heat", "rate", 1.0);
//!         Ok(())
//!     }
//! }
//!
//! fn new_diffusion(_name: &str) -> Box<dyn Component> {
//!     Box::new(Diffusion { rate: 0.0 })
//! }
//!
//! // Register the type, describe an instance, and walk the lifecycle.
//! let registry = ComponentRegistry::shared();
//! registry.add("Diffusion", DEFAULT_VERSION, new_diffusion)?;
//!
//! let root = Dictionary::from_json_str(
//!     r#"{ "components": { "heat": { "Type": "Diffusion", "rate": 0.25 } } }"#,
//! )?;
//! let cf = ComponentFactory::new(root, registry);
//! cf.create_components()?;
//! cf.construct_all(&mut ())?;
//!
//! let live = cf.live_register();
//! live.build_all(&mut ())?;
//! live.initialise_all(&mut ())?;
//! assert!(live.get("heat").unwrap().is_initialised());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `stratum-core` | `Dictionary` / `Value`, journal settings, tracing seam |
//! | [`lifecycle`] | `stratum-lifecycle` | Registry, factory, live register, phase machine |
//! | [`hooks`] | `stratum-hooks` | Entry points and typed hook lists |
//! | [`extension`] | `stratum-extension` | Extension managers for out-of-band per-object data |
//! | [`modules`] | `stratum-modules` | Plugin and toolbox loading |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Configuration model and shared plumbing (`stratum-core`).
///
/// The ordered [`types::Dictionary`] drives everything downstream, so its
/// entry order is load-bearing; [`types::similar_names`] and
/// [`types::JournalSettings`] serve the diagnostics the runtime emits.
pub use stratum_core as types;

/// The component lifecycle itself (`stratum-lifecycle`).
///
/// [`lifecycle::ComponentRegistry`] maps type names to constructors,
/// [`lifecycle::ComponentFactory`] creates and wires instances from a
/// dictionary, and [`lifecycle::LiveComponentRegister`] walks the phases
/// over the live population.
pub use stratum_lifecycle as lifecycle;

/// Entry points and hooks (`stratum-hooks`).
///
/// Declare an [`hooks::EntryPoint`] at a well-known moment and let
/// components and plugins splice [`hooks::Hook`]s into it.
pub use stratum_hooks as hooks;

/// Extension managers (`stratum-extension`).
///
/// [`extension::ExtensionManager`] attaches typed, word-aligned data to
/// objects that never planned for it.
pub use stratum_extension as extension;

/// Plugin and toolbox loading (`stratum-modules`).
///
/// [`modules::ModulesManager`] resolves module files on a search path,
/// loads declared dependencies first, and collects submitted codelets.
pub use stratum_modules as modules;

/// Common imports for typical Stratum usage.
///
/// ```rust
/// use stratum::prelude::*;
/// ```
pub mod prelude {
    // Configuration
    pub use stratum_core::{Dictionary, Value};

    // Lifecycle
    pub use stratum_lifecycle::{
        Component, ComponentFactory, ComponentInstance, ComponentRegistry, Constructor,
        LiveComponentRegister, SharedComponent, DEFAULT_VERSION,
    };

    // Errors
    pub use stratum_lifecycle::{FactoryError, LifecycleError, PhaseError, RegistryError};

    // Entry points
    pub use stratum_hooks::{CastType, EntryPoint, EntryPointRegister, Hook};

    // Extension
    pub use stratum_extension::ExtensionManager;

    // Modules
    pub use stratum_modules::{DlBackend, ModuleKind, ModulesManager};
}
