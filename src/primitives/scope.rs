// ============================================================================
// spark-resettable - Effect Scopes
// Owning groups of effects and cleanups
// ============================================================================
//
// Effects and watchers created inside `scope.run(..)` belong to the scope.
// Stopping the scope destroys them, runs registered cleanups newest first and
// stops nested scopes. Detached scopes are not collected by the enclosing one.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::types::AnyReaction;
use crate::primitives::effect::{destroy_effect, EffectInner};
use crate::reactivity::scheduling::schedule_effect;

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<Rc<ScopeInner>>> = const { RefCell::new(None) };
}

fn active_scope() -> Option<Rc<ScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

fn set_active_scope(scope: Option<Rc<ScopeInner>>) -> Option<Rc<ScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

pub type ScopeCleanupFn = Box<dyn FnOnce()>;

pub struct ScopeInner {
    active: Cell<bool>,
    paused: Cell<bool>,
    effects: RefCell<Vec<Rc<EffectInner>>>,
    cleanups: RefCell<Vec<ScopeCleanupFn>>,
    parent: Weak<ScopeInner>,
    children: RefCell<Vec<Rc<ScopeInner>>>,
    this: Weak<ScopeInner>,
}

impl ScopeInner {
    fn new(detached: bool) -> Rc<Self> {
        let parent = if detached { None } else { active_scope() };

        let scope = Rc::new_cyclic(|this| Self {
            active: Cell::new(true),
            paused: Cell::new(false),
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: parent.as_ref().map(Rc::downgrade).unwrap_or_default(),
            children: RefCell::new(Vec::new()),
            this: this.clone(),
        });

        if let Some(parent) = parent {
            parent.children.borrow_mut().push(scope.clone());
        }
        scope
    }

    fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if !self.active.get() {
            return None;
        }
        let this = self.this.upgrade()?;

        // Restores the previous scope even if `f` unwinds
        struct Restore(Option<Option<Rc<ScopeInner>>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                if let Some(prev) = self.0.take() {
                    set_active_scope(prev);
                }
            }
        }

        let _restore = Restore(Some(set_active_scope(Some(this))));
        Some(f())
    }

    fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }

        let effects: Vec<_> = self.effects.borrow_mut().drain(..).collect();
        for effect in &effects {
            destroy_effect(effect);
        }

        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups.into_iter().rev() {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup)).is_err() {
                tracing::warn!("scope cleanup panicked, continuing with the rest");
            }
        }

        let children: Vec<_> = self.children.borrow_mut().drain(..).collect();
        for child in children {
            child.stop();
        }

        if let Some(parent) = self.parent.upgrade() {
            parent
                .children
                .borrow_mut()
                .retain(|c| !std::ptr::eq(Rc::as_ptr(c), self));
        }

        tracing::trace!(effects = effects.len(), "effect scope stopped");
    }

    fn pause(&self) {
        if !self.active.get() || self.paused.replace(true) {
            return;
        }
        for effect in self.effects.borrow().iter() {
            effect.set_flags(effect.flags() | INERT);
        }
        for child in self.children.borrow().iter() {
            child.pause();
        }
    }

    fn resume(&self) {
        if !self.active.get() || !self.paused.replace(false) {
            return;
        }

        let effects: Vec<_> = self.effects.borrow().clone();
        for effect in effects {
            effect.set_flags(effect.flags() & !INERT);
            if effect.flags() & (DIRTY | MAYBE_DIRTY) != 0 {
                schedule_effect(effect);
            }
        }

        let children: Vec<_> = self.children.borrow().clone();
        for child in children {
            child.resume();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A group of effects, watchers and cleanups stopped together.
///
/// # Example
///
/// ```
/// use spark_resettable::{effect, effect_scope, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let runs = Rc::new(Cell::new(0));
///
/// let scope = effect_scope(false);
/// scope.run(|| {
///     let (count, runs) = (count.clone(), runs.clone());
///     effect(move || {
///         count.get();
///         runs.set(runs.get() + 1);
///     });
/// });
///
/// count.set(1);
/// assert_eq!(runs.get(), 2);
///
/// scope.stop();
/// count.set(2);
/// assert_eq!(runs.get(), 2);
/// ```
#[derive(Clone)]
pub struct EffectScope {
    inner: Rc<ScopeInner>,
}

impl EffectScope {
    pub fn active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// Run `f` with this scope collecting. `None` once stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        self.inner.run(f)
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Hold back owned effects. Writes made meanwhile are applied on resume.
    pub fn pause(&self) {
        self.inner.pause();
    }

    pub fn resume(&self) {
        self.inner.resume();
    }
}

impl Drop for EffectScope {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.stop();
        }
    }
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.active())
            .field("paused", &self.paused())
            .field("effects", &self.inner.effects.borrow().len())
            .finish()
    }
}

/// New scope. Unless `detached`, the scope running right now owns it.
pub fn effect_scope(detached: bool) -> EffectScope {
    EffectScope {
        inner: ScopeInner::new(detached),
    }
}

pub fn get_current_scope() -> Option<EffectScope> {
    active_scope().map(|inner| EffectScope { inner })
}

/// Run `f` when the current scope stops. Outside any scope `f` is dropped
/// without running.
pub fn on_scope_dispose<F: FnOnce() + 'static>(f: F) {
    match active_scope() {
        Some(scope) => scope.cleanups.borrow_mut().push(Box::new(f)),
        None => tracing::debug!("on_scope_dispose called outside of an effect scope"),
    }
}

pub(crate) fn register_effect_with_scope(effect: &Rc<EffectInner>) {
    if let Some(scope) = active_scope() {
        let mut effects = scope.effects.borrow_mut();
        effects.retain(|e| !e.is_destroyed());
        effects.push(effect.clone());
    }
}
