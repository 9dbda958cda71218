//! The component trait and its per-instance phase state machine.
//!
//! A [`Component`] supplies the phase callbacks; a [`ComponentInstance`]
//! wraps one behind a name and tracks which phases have run. Phase flags
//! live in [`Cell`]s outside the `RefCell` that guards the component
//! itself, so a component's phase state stays readable while its callback
//! is running. That is what lets construction of mutually dependent
//! components terminate: the instance is flagged constructed before its
//! callback starts, and any dependency that loops back sees the flag and
//! skips.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crate::factory::{ComponentFactory, FactoryError};

/// A live component shared between the register and its dependents.
pub type SharedComponent = Rc<ComponentInstance>;

// ── Downcast support ───────────────────────────────────────────────────────

/// Object-safe downcasting, blanket-implemented for every `'static` type.
pub trait AsAny {
    /// Borrow as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as [`Any`] for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ── Component trait ────────────────────────────────────────────────────────

/// Behaviour plugged into the lifecycle runtime.
///
/// Only [`construct`](Component::construct) is mandatory; the remaining
/// phases default to no-ops, which suits codelets that exist purely to
/// patch entry points at construction time.
pub trait Component: AsAny {
    /// The registered type name of this component.
    fn type_name(&self) -> &str;

    /// Whether this component can stand in for `type_name`.
    ///
    /// Defaults to exact equality. Override to accept ancestor type names
    /// when one component type substitutes for another.
    fn is_a(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    /// Resolve configuration: read parameters and wire up dependencies
    /// through the factory.
    fn construct(&mut self, cf: &ComponentFactory, data: &mut dyn Any)
        -> Result<(), FactoryError>;

    /// Allocate and assemble internal state.
    fn build(&mut self, data: &mut dyn Any) -> Result<(), PhaseError> {
        let _ = data;
        Ok(())
    }

    /// Fill built state with initial values.
    fn initialise(&mut self, data: &mut dyn Any) -> Result<(), PhaseError> {
        let _ = data;
        Ok(())
    }

    /// Perform the component's work.
    fn execute(&mut self, data: &mut dyn Any) -> Result<(), PhaseError> {
        let _ = data;
        Ok(())
    }

    /// Release resources. Runs at most once per instance.
    fn destroy(&mut self) {}
}

// ── Instance ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct PhaseFlags {
    constructed: Cell<bool>,
    built: Cell<bool>,
    initialised: Cell<bool>,
    executed: Cell<bool>,
    destroyed: Cell<bool>,
}

/// A named, phase-tracked component.
pub struct ComponentInstance {
    name: String,
    type_name: String,
    flags: PhaseFlags,
    locked: Cell<bool>,
    inner: RefCell<Box<dyn Component>>,
}

impl ComponentInstance {
    /// Wrap a component under `name`. `type_name` is the registered type
    /// the instance was created as.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        component: Box<dyn Component>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            flags: PhaseFlags::default(),
            locked: Cell::new(false),
            inner: RefCell::new(component),
        }
    }

    /// Like [`new`](Self::new), already wrapped for sharing.
    pub fn shared(
        name: impl Into<String>,
        type_name: impl Into<String>,
        component: Box<dyn Component>,
    ) -> SharedComponent {
        Rc::new(Self::new(name, type_name, component))
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this instance can stand in for `type_name`.
    ///
    /// Asks the component when it is not mid-phase; a component whose
    /// callback is currently running answers by registered type alone.
    pub fn is_a(&self, type_name: &str) -> bool {
        if self.type_name == type_name {
            return true;
        }
        match self.inner.try_borrow() {
            Ok(component) => component.is_a(type_name),
            Err(_) => false,
        }
    }

    /// Immutable access to the wrapped component.
    ///
    /// # Panics
    ///
    /// Panics if called while one of the instance's phase callbacks is
    /// running with mutable access.
    pub fn component(&self) -> Ref<'_, dyn Component> {
        Ref::map(self.inner.borrow(), |boxed| &**boxed)
    }

    /// Mutable access to the wrapped component.
    ///
    /// # Panics
    ///
    /// Panics if the component is currently borrowed.
    pub fn component_mut(&self) -> RefMut<'_, dyn Component> {
        RefMut::map(self.inner.borrow_mut(), |boxed| &mut **boxed)
    }

    // ── Flags ──────────────────────────────────────────────────────────────

    /// Whether construct has started or finished.
    pub fn is_constructed(&self) -> bool {
        self.flags.constructed.get()
    }

    /// Whether build has started or finished.
    pub fn is_built(&self) -> bool {
        self.flags.built.get()
    }

    /// Whether initialise has started or finished.
    pub fn is_initialised(&self) -> bool {
        self.flags.initialised.get()
    }

    /// Whether execute has completed at least once.
    pub fn has_executed(&self) -> bool {
        self.flags.executed.get()
    }

    /// Whether destroy has run.
    pub fn is_destroyed(&self) -> bool {
        self.flags.destroyed.get()
    }

    /// Protect this instance from [`destroy`](Self::destroy).
    pub fn lock(&self) {
        self.locked.set(true);
    }

    /// Allow [`destroy`](Self::destroy) again.
    pub fn unlock(&self) {
        self.locked.set(false);
    }

    /// Whether the instance is protected from destruction.
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    // ── Phase drivers ──────────────────────────────────────────────────────

    /// Run the construct phase unless it already ran and `force` is off.
    ///
    /// The constructed flag is set before the callback so dependency
    /// cycles terminate.
    pub fn construct(
        &self,
        cf: &ComponentFactory,
        data: &mut dyn Any,
        force: bool,
    ) -> Result<(), FactoryError> {
        if self.flags.constructed.get() && !force {
            return Ok(());
        }
        self.flags.constructed.set(true);
        let mut inner = self
            .inner
            .try_borrow_mut()
            .map_err(|_| FactoryError::ConstructionCycle {
                name: self.name.clone(),
            })?;
        inner.construct(cf, data)
    }

    /// Run the build phase unless it already ran and `force` is off.
    pub fn build(&self, data: &mut dyn Any, force: bool) -> Result<(), LifecycleError> {
        if self.flags.built.get() && !force {
            return Ok(());
        }
        self.flags.built.set(true);
        let mut inner = self.borrow_for(Phase::Build)?;
        inner.build(data).map_err(|source| LifecycleError::Failed {
            name: self.name.clone(),
            phase: Phase::Build,
            source,
        })
    }

    /// Run the initialise phase unless it already ran and `force` is off.
    pub fn initialise(&self, data: &mut dyn Any, force: bool) -> Result<(), LifecycleError> {
        if self.flags.initialised.get() && !force {
            return Ok(());
        }
        self.flags.initialised.set(true);
        let mut inner = self.borrow_for(Phase::Initialise)?;
        inner
            .initialise(data)
            .map_err(|source| LifecycleError::Failed {
                name: self.name.clone(),
                phase: Phase::Initialise,
                source,
            })
    }

    /// Run the execute phase unless it already completed and `force` is
    /// off. The executed flag records a *completed* run, so it is set
    /// after the callback returns success.
    pub fn execute(&self, data: &mut dyn Any, force: bool) -> Result<(), LifecycleError> {
        if self.flags.executed.get() && !force {
            return Ok(());
        }
        let mut inner = self.borrow_for(Phase::Execute)?;
        inner
            .execute(data)
            .map_err(|source| LifecycleError::Failed {
                name: self.name.clone(),
                phase: Phase::Execute,
                source,
            })?;
        self.flags.executed.set(true);
        Ok(())
    }

    /// Run the destroy phase. Skipped silently when already destroyed or
    /// locked.
    pub fn destroy(&self) -> Result<(), LifecycleError> {
        if self.flags.destroyed.get() || self.locked.get() {
            return Ok(());
        }
        self.flags.destroyed.set(true);
        let mut inner = self.borrow_for(Phase::Destroy)?;
        inner.destroy();
        Ok(())
    }

    fn borrow_for(&self, phase: Phase) -> Result<RefMut<'_, Box<dyn Component>>, LifecycleError> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| LifecycleError::Reentrant {
                name: self.name.clone(),
                phase,
            })
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructed", &self.flags.constructed.get())
            .field("built", &self.flags.built.get())
            .field("initialised", &self.flags.initialised.get())
            .field("executed", &self.flags.executed.get())
            .field("destroyed", &self.flags.destroyed.get())
            .field("locked", &self.locked.get())
            .finish()
    }
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// The lifecycle phases after construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Allocate and assemble internal state.
    Build,
    /// Fill built state with initial values.
    Initialise,
    /// Perform the component's work.
    Execute,
    /// Release resources.
    Destroy,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Build => "build",
            Phase::Initialise => "initialise",
            Phase::Execute => "execute",
            Phase::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// Failure reported by a component's own phase callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseError {
    /// Human-readable description of the failure.
    pub reason: String,
}

impl PhaseError {
    /// Build a phase error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl Error for PhaseError {}

/// Errors from driving a component through its phases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// The component's callback reported a failure.
    Failed {
        /// Instance name.
        name: String,
        /// Which phase failed.
        phase: Phase,
        /// The component's reported reason.
        source: PhaseError,
    },
    /// A phase was re-entered while its callback was still running.
    Reentrant {
        /// Instance name.
        name: String,
        /// The phase that re-entered.
        phase: Phase,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed {
                name,
                phase,
                source,
            } => write!(f, "component '{name}' failed during {phase}: {source}"),
            Self::Reentrant { name, phase } => {
                write!(f, "component '{name}' re-entered its {phase} phase")
            }
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::Reentrant { .. } => None,
        }
    }
}
