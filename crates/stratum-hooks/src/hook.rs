//! Hooks and their calling conventions.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Calling convention of an entry point and its hooks.
///
/// `Void0` through `Void3` pass zero to three opaque arguments and return
/// nothing. `Min1` / `Max1` fold the hooks' `f64` returns into a minimum
/// or maximum. The `Class*` variants bind each hook to a receiver object
/// passed as its first argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastType {
    /// No arguments.
    Void0,
    /// One opaque argument.
    Void1,
    /// Two opaque arguments.
    Void2,
    /// Three opaque arguments.
    Void3,
    /// One opaque argument; results fold into a minimum.
    Min1,
    /// One opaque argument; results fold into a maximum.
    Max1,
    /// Receiver only.
    ClassVoid0,
    /// Receiver plus one opaque argument.
    ClassVoid1,
    /// Receiver plus one opaque argument; minimum fold.
    ClassMin1,
    /// Receiver plus one opaque argument; maximum fold.
    ClassMax1,
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A hook's payload, one variant per [`CastType`].
///
/// Class-bound variants carry their receiver as `Rc<dyn Any>`; the hook
/// body downcasts. Receivers that need mutation wrap their state in a
/// `RefCell`.
pub enum HookFn {
    /// See [`CastType::Void0`].
    Void0(Box<dyn Fn()>),
    /// See [`CastType::Void1`].
    Void1(Box<dyn Fn(&mut dyn Any)>),
    /// See [`CastType::Void2`].
    Void2(Box<dyn Fn(&mut dyn Any, &mut dyn Any)>),
    /// See [`CastType::Void3`].
    Void3(Box<dyn Fn(&mut dyn Any, &mut dyn Any, &mut dyn Any)>),
    /// See [`CastType::Min1`].
    Min1(Box<dyn Fn(&mut dyn Any) -> f64>),
    /// See [`CastType::Max1`].
    Max1(Box<dyn Fn(&mut dyn Any) -> f64>),
    /// See [`CastType::ClassVoid0`].
    ClassVoid0 {
        /// The bound receiver.
        receiver: Rc<dyn Any>,
        /// The hook body.
        func: Box<dyn Fn(&dyn Any)>,
    },
    /// See [`CastType::ClassVoid1`].
    ClassVoid1 {
        /// The bound receiver.
        receiver: Rc<dyn Any>,
        /// The hook body.
        func: Box<dyn Fn(&dyn Any, &mut dyn Any)>,
    },
    /// See [`CastType::ClassMin1`].
    ClassMin1 {
        /// The bound receiver.
        receiver: Rc<dyn Any>,
        /// The hook body.
        func: Box<dyn Fn(&dyn Any, &mut dyn Any) -> f64>,
    },
    /// See [`CastType::ClassMax1`].
    ClassMax1 {
        /// The bound receiver.
        receiver: Rc<dyn Any>,
        /// The hook body.
        func: Box<dyn Fn(&dyn Any, &mut dyn Any) -> f64>,
    },
}

impl HookFn {
    /// The calling convention this payload satisfies.
    pub fn cast_type(&self) -> CastType {
        match self {
            HookFn::Void0(_) => CastType::Void0,
            HookFn::Void1(_) => CastType::Void1,
            HookFn::Void2(_) => CastType::Void2,
            HookFn::Void3(_) => CastType::Void3,
            HookFn::Min1(_) => CastType::Min1,
            HookFn::Max1(_) => CastType::Max1,
            HookFn::ClassVoid0 { .. } => CastType::ClassVoid0,
            HookFn::ClassVoid1 { .. } => CastType::ClassVoid1,
            HookFn::ClassMin1 { .. } => CastType::ClassMin1,
            HookFn::ClassMax1 { .. } => CastType::ClassMax1,
        }
    }
}

/// A named hook with provenance.
pub struct Hook {
    name: String,
    added_by: String,
    func: HookFn,
}

impl Hook {
    /// Wrap a payload under `name`.
    pub fn new(name: impl Into<String>, func: HookFn) -> Self {
        Self {
            name: name.into(),
            added_by: String::new(),
            func,
        }
    }

    /// Record which module or subsystem registered this hook.
    pub fn added_by(mut self, who: impl Into<String>) -> Self {
        self.added_by = who.into();
        self
    }

    /// Hook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Who registered the hook, or `""`.
    pub fn provenance(&self) -> &str {
        &self.added_by
    }

    /// The payload.
    pub fn func(&self) -> &HookFn {
        &self.func
    }

    /// The calling convention of the payload.
    pub fn cast_type(&self) -> CastType {
        self.func.cast_type()
    }

    // ── Convenience constructors ───────────────────────────────────────────

    /// A [`CastType::Void0`] hook.
    pub fn void0(name: impl Into<String>, f: impl Fn() + 'static) -> Self {
        Self::new(name, HookFn::Void0(Box::new(f)))
    }

    /// A [`CastType::Void1`] hook.
    pub fn void1(name: impl Into<String>, f: impl Fn(&mut dyn Any) + 'static) -> Self {
        Self::new(name, HookFn::Void1(Box::new(f)))
    }

    /// A [`CastType::Void2`] hook.
    pub fn void2(
        name: impl Into<String>,
        f: impl Fn(&mut dyn Any, &mut dyn Any) + 'static,
    ) -> Self {
        Self::new(name, HookFn::Void2(Box::new(f)))
    }

    /// A [`CastType::Void3`] hook.
    pub fn void3(
        name: impl Into<String>,
        f: impl Fn(&mut dyn Any, &mut dyn Any, &mut dyn Any) + 'static,
    ) -> Self {
        Self::new(name, HookFn::Void3(Box::new(f)))
    }

    /// A [`CastType::Min1`] hook.
    pub fn min1(name: impl Into<String>, f: impl Fn(&mut dyn Any) -> f64 + 'static) -> Self {
        Self::new(name, HookFn::Min1(Box::new(f)))
    }

    /// A [`CastType::Max1`] hook.
    pub fn max1(name: impl Into<String>, f: impl Fn(&mut dyn Any) -> f64 + 'static) -> Self {
        Self::new(name, HookFn::Max1(Box::new(f)))
    }

    /// A [`CastType::ClassVoid0`] hook bound to `receiver`.
    pub fn class_void0<T: 'static>(
        name: impl Into<String>,
        receiver: Rc<T>,
        f: impl Fn(&T) + 'static,
    ) -> Self {
        Self::new(
            name,
            HookFn::ClassVoid0 {
                receiver,
                func: Box::new(move |any| {
                    let typed = any.downcast_ref::<T>().expect("receiver type bound at hook creation");
                    f(typed);
                }),
            },
        )
    }

    /// A [`CastType::ClassVoid1`] hook bound to `receiver`.
    pub fn class_void1<T: 'static>(
        name: impl Into<String>,
        receiver: Rc<T>,
        f: impl Fn(&T, &mut dyn Any) + 'static,
    ) -> Self {
        Self::new(
            name,
            HookFn::ClassVoid1 {
                receiver,
                func: Box::new(move |any, data| {
                    let typed = any.downcast_ref::<T>().expect("receiver type bound at hook creation");
                    f(typed, data);
                }),
            },
        )
    }

    /// A [`CastType::ClassMin1`] hook bound to `receiver`.
    pub fn class_min1<T: 'static>(
        name: impl Into<String>,
        receiver: Rc<T>,
        f: impl Fn(&T, &mut dyn Any) -> f64 + 'static,
    ) -> Self {
        Self::new(
            name,
            HookFn::ClassMin1 {
                receiver,
                func: Box::new(move |any, data| {
                    let typed = any.downcast_ref::<T>().expect("receiver type bound at hook creation");
                    f(typed, data)
                }),
            },
        )
    }

    /// A [`CastType::ClassMax1`] hook bound to `receiver`.
    pub fn class_max1<T: 'static>(
        name: impl Into<String>,
        receiver: Rc<T>,
        f: impl Fn(&T, &mut dyn Any) -> f64 + 'static,
    ) -> Self {
        Self::new(
            name,
            HookFn::ClassMax1 {
                receiver,
                func: Box::new(move |any, data| {
                    let typed = any.downcast_ref::<T>().expect("receiver type bound at hook creation");
                    f(typed, data)
                }),
            },
        )
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("added_by", &self.added_by)
            .field("cast_type", &self.cast_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn payload_reports_its_cast_type() {
        assert_eq!(Hook::void0("h", || {}).cast_type(), CastType::Void0);
        assert_eq!(Hook::min1("h", |_| 0.0).cast_type(), CastType::Min1);
    }

    #[test]
    fn class_hook_downcasts_its_receiver() {
        struct Counter {
            hits: Cell<usize>,
        }
        let receiver = Rc::new(Counter { hits: Cell::new(0) });
        let hook = Hook::class_void0("count", receiver.clone(), |c: &Counter| {
            c.hits.set(c.hits.get() + 1);
        });
        if let HookFn::ClassVoid0 { receiver, func } = hook.func() {
            func(receiver.as_ref());
        } else {
            panic!("wrong payload");
        }
        assert_eq!(receiver.hits.get(), 1);
    }

    #[test]
    fn provenance_defaults_empty() {
        let hook = Hook::void0("h", || {}).added_by("SurfaceProcesses");
        assert_eq!(hook.provenance(), "SurfaceProcesses");
        assert_eq!(Hook::void0("h", || {}).provenance(), "");
    }
}
