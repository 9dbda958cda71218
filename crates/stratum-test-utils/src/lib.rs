//! Fixture components and recording tracers for Stratum development.
//!
//! Provides small [`Component`] implementations that count their phase
//! calls, resolve dependencies through the factory, or form deliberate
//! dependency cycles, plus [`register_fixtures`] to install the whole set
//! into a [`ComponentRegistry`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use stratum_core::Tracer;
use stratum_lifecycle::{
    Component, ComponentFactory, ComponentRegistry, FactoryError, PhaseError, RegistryError,
    SharedComponent,
};

/// Register every fixture type below under its type name.
pub fn register_fixtures(registry: &ComponentRegistry) -> Result<(), RegistryError> {
    registry.add("ContextFixture", "0", new_context_fixture)?;
    registry.add("MeshFixture", "0", new_mesh_fixture)?;
    registry.add("DependentFixture", "0", new_dependent_fixture)?;
    registry.add("CyclicFixture", "0", new_cyclic_fixture)?;
    registry.add("FailingFixture", "0", new_failing_fixture)?;
    Ok(())
}

// ── ContextFixture ─────────────────────────────────────────────────────────

/// Stand-in for a context component type. Counts phase calls.
pub struct ContextFixture {
    pub name: String,
    pub constructs: usize,
    pub builds: usize,
    pub initialises: usize,
    pub executes: usize,
}

pub fn new_context_fixture(name: &str) -> Box<dyn Component> {
    Box::new(ContextFixture {
        name: name.to_owned(),
        constructs: 0,
        builds: 0,
        initialises: 0,
        executes: 0,
    })
}

impl Component for ContextFixture {
    fn type_name(&self) -> &str {
        "ContextFixture"
    }
    fn construct(&mut self, _cf: &ComponentFactory, _data: &mut dyn Any)
        -> Result<(), FactoryError> {
        self.constructs += 1;
        Ok(())
    }
    fn build(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        self.builds += 1;
        Ok(())
    }
    fn initialise(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        self.initialises += 1;
        Ok(())
    }
    fn execute(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        self.executes += 1;
        Ok(())
    }
}

// ── MeshFixture ────────────────────────────────────────────────────────────

/// Leaf dependency with a `dim` parameter and phase counters.
pub struct MeshFixture {
    pub name: String,
    pub dim: u64,
    pub constructs: usize,
    pub builds: usize,
    pub destroys: usize,
}

pub fn new_mesh_fixture(name: &str) -> Box<dyn Component> {
    Box::new(MeshFixture {
        name: name.to_owned(),
        dim: 0,
        constructs: 0,
        builds: 0,
        destroys: 0,
    })
}

impl Component for MeshFixture {
    fn type_name(&self) -> &str {
        "MeshFixture"
    }
    fn construct(&mut self, cf: &ComponentFactory, _data: &mut dyn Any)
        -> Result<(), FactoryError> {
        self.constructs += 1;
        self.dim = cf.get_uint(&self.name, "dim", 2);
        Ok(())
    }
    fn build(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        self.builds += 1;
        Ok(())
    }
    fn destroy(&mut self) {
        self.destroys += 1;
    }
}

// ── DependentFixture ───────────────────────────────────────────────────────

/// Resolves a `mesh` dependency and a `tolerance` parameter at
/// construction, the way real components wire themselves up.
pub struct DependentFixture {
    pub name: String,
    pub mesh: Option<SharedComponent>,
    pub tolerance: f64,
}

pub fn new_dependent_fixture(name: &str) -> Box<dyn Component> {
    Box::new(DependentFixture {
        name: name.to_owned(),
        mesh: None,
        tolerance: 0.0,
    })
}

impl Component for DependentFixture {
    fn type_name(&self) -> &str {
        "DependentFixture"
    }
    fn construct(&mut self, cf: &ComponentFactory, data: &mut dyn Any)
        -> Result<(), FactoryError> {
        self.mesh = cf.construct_by_key(&self.name, "mesh", "MeshFixture", true, data)?;
        self.tolerance = cf.get_double(&self.name, "tolerance", 1e-3);
        Ok(())
    }
}

// ── CyclicFixture ──────────────────────────────────────────────────────────

/// Half of a deliberate two-component dependency cycle. Construction of
/// either member must terminate with both constructed.
pub struct CyclicFixture {
    pub name: String,
    pub partner: Option<SharedComponent>,
    pub constructs: usize,
}

pub fn new_cyclic_fixture(name: &str) -> Box<dyn Component> {
    Box::new(CyclicFixture {
        name: name.to_owned(),
        partner: None,
        constructs: 0,
    })
}

impl Component for CyclicFixture {
    fn type_name(&self) -> &str {
        "CyclicFixture"
    }
    fn construct(&mut self, cf: &ComponentFactory, data: &mut dyn Any)
        -> Result<(), FactoryError> {
        self.constructs += 1;
        self.partner =
            cf.construct_by_key(&self.name, "partner", "CyclicFixture", true, data)?;
        Ok(())
    }
}

// ── FailingFixture ─────────────────────────────────────────────────────────

/// Fails the phase named by its `failOn` parameter (default `build`).
/// `failOn: "construct"` reports a [`FactoryError::ConstructFailed`] the
/// way a real component rejects its own configuration.
pub struct FailingFixture {
    pub name: String,
    pub fail_on: String,
}

pub fn new_failing_fixture(name: &str) -> Box<dyn Component> {
    Box::new(FailingFixture {
        name: name.to_owned(),
        fail_on: "build".to_owned(),
    })
}

impl Component for FailingFixture {
    fn type_name(&self) -> &str {
        "FailingFixture"
    }
    fn construct(&mut self, cf: &ComponentFactory, _data: &mut dyn Any)
        -> Result<(), FactoryError> {
        self.fail_on = cf.get_string(&self.name, "failOn", "build");
        if self.fail_on == "construct" {
            return Err(FactoryError::ConstructFailed {
                name: self.name.clone(),
                reason: "fixture construct failure".to_owned(),
            });
        }
        Ok(())
    }
    fn build(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        if self.fail_on == "build" {
            return Err(PhaseError::new("fixture build failure"));
        }
        Ok(())
    }
    fn initialise(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        if self.fail_on == "initialise" {
            return Err(PhaseError::new("fixture initialise failure"));
        }
        Ok(())
    }
    fn execute(&mut self, _data: &mut dyn Any) -> Result<(), PhaseError> {
        if self.fail_on == "execute" {
            return Err(PhaseError::new("fixture execute failure"));
        }
        Ok(())
    }
}

// ── RecordingTracer ────────────────────────────────────────────────────────

/// Tracer that appends `+span` / `-span` markers to a shared log.
#[derive(Clone, Default)]
pub struct RecordingTracer {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The markers recorded so far, in order.
    pub fn spans(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Tracer for RecordingTracer {
    fn enter(&self, span: &str) {
        self.log.borrow_mut().push(format!("+{span}"));
    }
    fn exit(&self, span: &str) {
        self.log.borrow_mut().push(format!("-{span}"));
    }
}
