//! Ordered hook lists with pinned first and last slots.

use std::any::Any;
use std::error::Error;
use std::fmt;

use smallvec::SmallVec;

use crate::hook::{CastType, Hook, HookFn};

/// A named extension seam holding an ordered list of hooks.
///
/// Ordinary appends land before the always-last hook and ordinary
/// prepends land after the always-first hook, so the pinned positions
/// survive any sequence of list edits. Pin misuse (claiming a pin twice,
/// inserting around a pin, naming a missing hook) is a programming error
/// and panics; a hook list that is merely empty is at worst a logged
/// warning.
pub struct EntryPoint {
    name: String,
    cast_type: CastType,
    hooks: SmallVec<[Hook; 4]>,
    always_first: Option<String>,
    always_last: Option<String>,
}

impl EntryPoint {
    /// Create an empty entry point with a fixed calling convention.
    pub fn new(name: impl Into<String>, cast_type: CastType) -> Self {
        Self {
            name: name.into(),
            cast_type,
            hooks: SmallVec::new(),
            always_first: None,
            always_last: None,
        }
    }

    /// Entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The calling convention every hook here must match.
    pub fn cast_type(&self) -> CastType {
        self.cast_type
    }

    /// Number of hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the hook list is empty.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names in run order.
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(Hook::name).collect()
    }

    /// Whether a hook named `name` is present.
    pub fn has_hook(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Name of the always-first hook, if claimed.
    pub fn always_first(&self) -> Option<&str> {
        self.always_first.as_deref()
    }

    /// Name of the always-last hook, if claimed.
    pub fn always_last(&self) -> Option<&str> {
        self.always_last.as_deref()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.hooks.iter().position(|h| h.name() == name)
    }

    fn check_cast(&self, hook: &Hook) {
        assert!(
            hook.cast_type() == self.cast_type,
            "entry point '{}' has cast type {}, hook '{}' is {}",
            self.name,
            self.cast_type,
            hook.name(),
            hook.cast_type()
        );
    }

    fn require(&self, name: &str) -> usize {
        match self.index_of(name) {
            Some(index) => index,
            None => panic!("entry point '{}' has no hook named '{name}'", self.name),
        }
    }

    // ── List edits ─────────────────────────────────────────────────────────

    /// Add a hook at the end of the list, before the always-last hook if
    /// one is claimed.
    pub fn append(&mut self, hook: Hook) {
        self.check_cast(&hook);
        match self.always_last.as_deref().and_then(|n| self.index_of(n)) {
            Some(last) => self.hooks.insert(last, hook),
            None => self.hooks.push(hook),
        }
    }

    /// Add a hook at the front of the list, after the always-first hook
    /// if one is claimed.
    pub fn prepend(&mut self, hook: Hook) {
        self.check_cast(&hook);
        match self.always_first.as_deref().and_then(|n| self.index_of(n)) {
            Some(first) => self.hooks.insert(first + 1, hook),
            None => self.hooks.insert(0, hook),
        }
    }

    /// Add a hook pinned to the very front.
    ///
    /// # Panics
    ///
    /// Panics if the always-first slot is already claimed.
    pub fn prepend_always_first(&mut self, hook: Hook) {
        self.check_cast(&hook);
        if let Some(existing) = &self.always_first {
            panic!(
                "entry point '{}' already has an always-first hook '{existing}'",
                self.name
            );
        }
        self.always_first = Some(hook.name().to_owned());
        self.hooks.insert(0, hook);
    }

    /// Add a hook pinned to the very end.
    ///
    /// # Panics
    ///
    /// Panics if the always-last slot is already claimed.
    pub fn append_always_last(&mut self, hook: Hook) {
        self.check_cast(&hook);
        if let Some(existing) = &self.always_last {
            panic!(
                "entry point '{}' already has an always-last hook '{existing}'",
                self.name
            );
        }
        self.always_last = Some(hook.name().to_owned());
        self.hooks.push(hook);
    }

    /// Insert a hook immediately before `target`.
    ///
    /// # Panics
    ///
    /// Panics if `target` is absent or is the always-first hook.
    pub fn insert_before(&mut self, target: &str, hook: Hook) {
        self.check_cast(&hook);
        if self.always_first.as_deref() == Some(target) {
            panic!(
                "cannot insert before the always-first hook of entry point '{}'",
                self.name
            );
        }
        let index = self.require(target);
        self.hooks.insert(index, hook);
    }

    /// Insert a hook immediately after `target`.
    ///
    /// # Panics
    ///
    /// Panics if `target` is absent or is the always-last hook.
    pub fn insert_after(&mut self, target: &str, hook: Hook) {
        self.check_cast(&hook);
        if self.always_last.as_deref() == Some(target) {
            panic!(
                "cannot insert after the always-last hook of entry point '{}'",
                self.name
            );
        }
        let index = self.require(target);
        self.hooks.insert(index + 1, hook);
    }

    /// Swap `target` for `hook` in place. A replaced pinned hook loses
    /// its pin designation.
    ///
    /// # Panics
    ///
    /// Panics if `target` is absent.
    pub fn replace(&mut self, target: &str, hook: Hook) {
        self.check_cast(&hook);
        let index = self.require(target);
        if self.always_first.as_deref() == Some(target) {
            self.always_first = None;
        }
        if self.always_last.as_deref() == Some(target) {
            self.always_last = None;
        }
        self.hooks[index] = hook;
    }

    /// Drop every hook and install `hook` as the sole entry. Pins are
    /// cleared.
    pub fn replace_all(&mut self, hook: Hook) {
        self.check_cast(&hook);
        self.purge();
        self.hooks.push(hook);
    }

    /// Remove the hook named `name`. Removing a pinned hook releases the
    /// pin.
    ///
    /// # Panics
    ///
    /// Panics if `name` is absent.
    pub fn remove(&mut self, name: &str) {
        let index = self.require(name);
        if self.always_first.as_deref() == Some(name) {
            self.always_first = None;
        }
        if self.always_last.as_deref() == Some(name) {
            self.always_last = None;
        }
        self.hooks.remove(index);
    }

    /// Drop every hook and release both pins.
    pub fn purge(&mut self) {
        self.hooks.clear();
        self.always_first = None;
        self.always_last = None;
    }

    // ── Dispatch ───────────────────────────────────────────────────────────

    /// Run all hooks of a [`CastType::Void0`] or [`CastType::ClassVoid0`]
    /// entry point.
    pub fn run0(&self) {
        for hook in &self.hooks {
            match hook.func() {
                HookFn::Void0(f) => f(),
                HookFn::ClassVoid0 { receiver, func } => func(receiver.as_ref()),
                _ => self.wrong_convention("run0"),
            }
        }
    }

    /// Run all hooks of a [`CastType::Void1`] or [`CastType::ClassVoid1`]
    /// entry point.
    pub fn run1(&self, data: &mut dyn Any) {
        for hook in &self.hooks {
            match hook.func() {
                HookFn::Void1(f) => f(data),
                HookFn::ClassVoid1 { receiver, func } => func(receiver.as_ref(), data),
                _ => self.wrong_convention("run1"),
            }
        }
    }

    /// Run all hooks of a [`CastType::Void2`] entry point.
    pub fn run2(&self, data0: &mut dyn Any, data1: &mut dyn Any) {
        for hook in &self.hooks {
            match hook.func() {
                HookFn::Void2(f) => f(data0, data1),
                _ => self.wrong_convention("run2"),
            }
        }
    }

    /// Run all hooks of a [`CastType::Void3`] entry point.
    pub fn run3(&self, data0: &mut dyn Any, data1: &mut dyn Any, data2: &mut dyn Any) {
        for hook in &self.hooks {
            match hook.func() {
                HookFn::Void3(f) => f(data0, data1, data2),
                _ => self.wrong_convention("run3"),
            }
        }
    }

    /// Fold the hooks of a [`CastType::Min1`] or [`CastType::ClassMin1`]
    /// entry point into their minimum. An empty list yields positive
    /// infinity.
    pub fn run_min(&self, data: &mut dyn Any) -> f64 {
        let mut out = f64::INFINITY;
        for hook in &self.hooks {
            let value = match hook.func() {
                HookFn::Min1(f) => f(data),
                HookFn::ClassMin1 { receiver, func } => func(receiver.as_ref(), data),
                _ => self.wrong_convention("run_min"),
            };
            out = out.min(value);
        }
        out
    }

    /// Fold the hooks of a [`CastType::Max1`] or [`CastType::ClassMax1`]
    /// entry point into their maximum. An empty list yields negative
    /// infinity.
    pub fn run_max(&self, data: &mut dyn Any) -> f64 {
        let mut out = f64::NEG_INFINITY;
        for hook in &self.hooks {
            let value = match hook.func() {
                HookFn::Max1(f) => f(data),
                HookFn::ClassMax1 { receiver, func } => func(receiver.as_ref(), data),
                _ => self.wrong_convention("run_max"),
            };
            out = out.max(value);
        }
        out
    }

    fn wrong_convention(&self, entry: &str) -> ! {
        panic!(
            "{entry} on entry point '{}' with cast type {}",
            self.name, self.cast_type
        )
    }

    // ── Diagnostics ────────────────────────────────────────────────────────

    /// Log a warning when the hook list is empty. `caller` names the code
    /// about to run the entry point.
    pub fn warn_if_no_hooks(&self, caller: &str) {
        if self.hooks.is_empty() {
            log::warn!(
                "entry point '{}' run by {caller} has no hooks",
                self.name
            );
        }
    }

    /// An empty hook list as a hard configuration error, for entry points
    /// whose output is meaningless without at least one contributor.
    pub fn error_if_no_hooks(&self, caller: &str) -> Result<(), EntryPointError> {
        if self.hooks.is_empty() {
            return Err(EntryPointError::NoHooks {
                entry_point: self.name.clone(),
                caller: caller.to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("cast_type", &self.cast_type)
            .field("hooks", &self.hook_names())
            .field("always_first", &self.always_first)
            .field("always_last", &self.always_last)
            .finish()
    }
}

/// Errors surfaced by entry points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryPointError {
    /// An entry point that requires contributors has none.
    NoHooks {
        /// The empty entry point.
        entry_point: String,
        /// The code that was about to run it.
        caller: String,
    },
}

impl fmt::Display for EntryPointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHooks {
                entry_point,
                caller,
            } => write!(f, "entry point '{entry_point}' run by {caller} has no hooks"),
        }
    }
}

impl Error for EntryPointError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn marker(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Hook {
        let log = log.clone();
        Hook::void0(label, move || log.borrow_mut().push(label))
    }

    fn run_order(ep: &EntryPoint, log: &Rc<RefCell<Vec<&'static str>>>) -> Vec<&'static str> {
        log.borrow_mut().clear();
        ep.run0();
        log.borrow().clone()
    }

    #[test]
    fn append_and_prepend_respect_pins() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.prepend_always_first(marker(&log, "first"));
        ep.append_always_last(marker(&log, "last"));
        ep.append(marker(&log, "a"));
        ep.prepend(marker(&log, "b"));
        ep.append(marker(&log, "c"));
        assert_eq!(run_order(&ep, &log), ["first", "b", "a", "c", "last"]);
    }

    #[test]
    fn insert_before_and_after() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.append(marker(&log, "a"));
        ep.append(marker(&log, "c"));
        ep.insert_before("c", marker(&log, "b"));
        ep.insert_after("c", marker(&log, "d"));
        assert_eq!(run_order(&ep, &log), ["a", "b", "c", "d"]);
    }

    #[test]
    #[should_panic(expected = "already has an always-first hook")]
    fn second_always_first_claim_panics() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.prepend_always_first(marker(&log, "one"));
        ep.prepend_always_first(marker(&log, "two"));
    }

    #[test]
    #[should_panic(expected = "cannot insert after the always-last hook")]
    fn insert_after_pin_panics() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.append_always_last(marker(&log, "last"));
        ep.insert_after("last", marker(&log, "late"));
    }

    #[test]
    #[should_panic(expected = "has cast type")]
    fn cast_mismatch_panics() {
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.append(Hook::min1("dt", |_| 0.1));
    }

    #[test]
    fn replace_clears_pin() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.append_always_last(marker(&log, "last"));
        ep.replace("last", marker(&log, "plain"));
        assert_eq!(ep.always_last(), None);
        // the slot is no longer pinned, so appends go after it
        ep.append(marker(&log, "tail"));
        assert_eq!(run_order(&ep, &log), ["plain", "tail"]);
    }

    #[test]
    fn replace_all_leaves_single_hook() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.prepend_always_first(marker(&log, "first"));
        ep.append(marker(&log, "a"));
        ep.replace_all(marker(&log, "only"));
        assert_eq!(run_order(&ep, &log), ["only"]);
        assert_eq!(ep.always_first(), None);
    }

    #[test]
    fn remove_releases_pin() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ep = EntryPoint::new("tick", CastType::Void0);
        ep.prepend_always_first(marker(&log, "first"));
        ep.remove("first");
        assert!(ep.is_empty());
        // the slot is free to claim again
        ep.prepend_always_first(marker(&log, "newFirst"));
    }

    #[test]
    fn min_and_max_fold_with_seeds() {
        let mut min_ep = EntryPoint::new("dt", CastType::Min1);
        let mut data = ();
        assert_eq!(min_ep.run_min(&mut data), f64::INFINITY);
        min_ep.append(Hook::min1("a", |_| 0.5));
        min_ep.append(Hook::min1("b", |_| 0.2));
        min_ep.append(Hook::min1("c", |_| 0.9));
        assert_eq!(min_ep.run_min(&mut data), 0.2);

        let mut max_ep = EntryPoint::new("cfl", CastType::Max1);
        assert_eq!(max_ep.run_max(&mut data), f64::NEG_INFINITY);
        max_ep.append(Hook::max1("a", |_| -2.0));
        assert_eq!(max_ep.run_max(&mut data), -2.0);
    }

    #[test]
    fn class_hooks_dispatch_with_receiver() {
        struct Accumulator {
            total: RefCell<f64>,
        }
        let acc = Rc::new(Accumulator {
            total: RefCell::new(0.0),
        });
        let mut ep = EntryPoint::new("accumulate", CastType::ClassVoid1);
        ep.append(Hook::class_void1(
            "add",
            acc.clone(),
            |a: &Accumulator, data| {
                if let Some(x) = data.downcast_ref::<f64>() {
                    *a.total.borrow_mut() += x;
                }
            },
        ));
        let mut data = 2.5f64;
        ep.run1(&mut data);
        ep.run1(&mut data);
        assert_eq!(*acc.total.borrow(), 5.0);
    }

    #[test]
    fn run1_passes_data_to_each_hook() {
        let mut ep = EntryPoint::new("scale", CastType::Void1);
        ep.append(Hook::void1("double", |data| {
            if let Some(x) = data.downcast_mut::<f64>() {
                *x *= 2.0;
            }
        }));
        ep.append(Hook::void1("inc", |data| {
            if let Some(x) = data.downcast_mut::<f64>() {
                *x += 1.0;
            }
        }));
        let mut value = 3.0f64;
        ep.run1(&mut value);
        assert_eq!(value, 7.0);
    }

    #[test]
    fn no_hooks_diagnostics() {
        let ep = EntryPoint::new("tick", CastType::Void0);
        ep.warn_if_no_hooks("TimeIntegrator");
        assert_eq!(
            ep.error_if_no_hooks("TimeIntegrator").unwrap_err(),
            EntryPointError::NoHooks {
                entry_point: "tick".into(),
                caller: "TimeIntegrator".into(),
            }
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // appends never disturb the relative order of earlier hooks,
            // pinned ends included
            #[test]
            fn append_preserves_relative_order(labels in proptest::collection::vec(0usize..100, 1..20)) {
                let log = Rc::new(RefCell::new(Vec::new()));
                let mut ep = EntryPoint::new("tick", CastType::Void0);
                ep.prepend_always_first(marker(&log, "first"));
                ep.append_always_last(marker(&log, "last"));
                let mut expected = vec!["first".to_owned()];
                for (i, label) in labels.iter().enumerate() {
                    let name = format!("h{i}_{label}");
                    let log = log.clone();
                    let recorded: &'static str = Box::leak(name.clone().into_boxed_str());
                    ep.append(Hook::void0(name, move || {
                        log.borrow_mut().push(recorded)
                    }));
                    expected.push(recorded.to_owned());
                }
                expected.push("last".to_owned());
                log.borrow_mut().clear();
                ep.run0();
                let got: Vec<String> = log.borrow().iter().map(|s| s.to_string()).collect();
                prop_assert_eq!(got, expected);
            }
        }
    }
}
