// ============================================================================
// spark-resettable - Effects
// Side effects that rerun when what they read changes
// ============================================================================
//
// An effect runs once when created and again after every write that dirties
// it. Effects created while another effect runs become its children: they are
// destroyed before the parent reruns and when the parent is destroyed.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource, DepList};
use crate::primitives::scope::register_effect_with_scope;
use crate::reactivity::tracking::{install_dependencies, remove_reactions};

/// Returned by an effect run, called before the next run and on destroy.
pub type CleanupFn = Box<dyn FnOnce()>;

type EffectFn = Box<dyn FnMut() -> Option<CleanupFn>>;

// =============================================================================
// EFFECT INNER
// =============================================================================

pub struct EffectInner {
    flags: Cell<u32>,
    /// Taken out while running so the body may destroy its own effect
    func: RefCell<Option<EffectFn>>,
    deps: DepList,
    run_version: Cell<u32>,
    teardown: RefCell<Option<CleanupFn>>,
    parent: RefCell<Weak<EffectInner>>,
    children: RefCell<Vec<Rc<EffectInner>>>,
    this: Weak<EffectInner>,
}

impl EffectInner {
    fn new(func: EffectFn) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            flags: Cell::new(EFFECT | DIRTY),
            func: RefCell::new(Some(func)),
            deps: DepList::default(),
            run_version: Cell::new(0),
            teardown: RefCell::new(None),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            this: this.clone(),
        })
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn run_teardown(&self) {
        let teardown = self.teardown.borrow_mut().take();
        if let Some(cleanup) = teardown {
            cleanup();
        }
    }
}

impl AnyReaction for EffectInner {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn deps(&self) -> &DepList {
        &self.deps
    }

    fn update(&self) -> bool {
        if let Some(this) = self.this.upgrade() {
            update_effect(&this);
        }
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
        None
    }

    fn run_version(&self) -> u32 {
        self.run_version.get()
    }
}

// =============================================================================
// RUN AND DESTROY
// =============================================================================

/// Run an effect body with dependency collection.
pub fn update_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    effect.set_status(CLEAN);
    destroy_children(effect);
    effect.run_teardown();

    let Some(mut func) = effect.func.borrow_mut().take() else {
        return;
    };

    let reaction: Rc<dyn AnyReaction> = effect.clone();
    let (prev_reaction, prev_deps, prev_run, prev_untracking) = with_context(|ctx| {
        (
            ctx.set_active_reaction(Some(Rc::downgrade(&reaction))),
            ctx.swap_new_deps(Vec::new()),
            ctx.next_read_version(),
            ctx.set_untracking(false),
        )
    });

    effect.set_flags(effect.flags() | REACTION_IS_UPDATING);
    let teardown = func();
    effect.set_flags(effect.flags() & !REACTION_IS_UPDATING);

    let new_deps = with_context(|ctx| {
        ctx.set_active_reaction(prev_reaction);
        ctx.set_read_version(prev_run);
        ctx.set_untracking(prev_untracking);
        ctx.swap_new_deps(prev_deps)
    });

    if effect.is_destroyed() {
        // Destroyed by its own body: nothing left to rerun
        if let Some(cleanup) = teardown {
            cleanup();
        }
        return;
    }

    install_dependencies(&reaction, new_deps);
    effect
        .run_version
        .set(with_context(|ctx| ctx.write_version()));
    *effect.func.borrow_mut() = Some(func);
    *effect.teardown.borrow_mut() = teardown;
}

fn destroy_children(effect: &Rc<EffectInner>) {
    let children: Vec<_> = effect.children.borrow_mut().drain(..).collect();
    for child in children {
        destroy_effect(&child);
    }
}

/// Destroy an effect and its children, unlink it and run its teardown.
pub fn destroy_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }
    effect.set_flags(effect.flags() | DESTROYED);

    destroy_children(effect);
    remove_reactions(&(effect.clone() as Rc<dyn AnyReaction>), 0);

    let parent = effect.parent.replace(Weak::new()).upgrade();
    if let Some(parent) = parent {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, effect));
    }

    effect.run_teardown();
    effect.func.borrow_mut().take();
}

// =============================================================================
// EFFECT HANDLE
// =============================================================================

/// Handle to a running effect.
///
/// Dropping the last handle of an effect nobody else owns destroys it. Child
/// effects are owned by their parent and scoped ones by their scope, so those
/// keep running until the owner goes.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    pub fn inner(&self) -> &Rc<EffectInner> {
        &self.inner
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Stop the effect now. Idempotent.
    pub fn dispose(&self) {
        destroy_effect(&self.inner);
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("destroyed", &self.is_destroyed())
            .field("deps", &self.inner.deps.len())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Run `f` now and again whenever a value it read changes.
///
/// # Example
///
/// ```
/// use spark_resettable::{effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let handle = effect({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// });
/// count.set(3);
/// assert_eq!(seen.get(), 3);
///
/// handle.dispose();
/// count.set(4);
/// assert_eq!(seen.get(), 3);
/// ```
pub fn effect<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    effect_with_cleanup(move || {
        f();
        None
    })
}

/// Like [`effect`], but the body may return a cleanup that runs before the
/// next run and when the effect is destroyed.
pub fn effect_with_cleanup<F>(f: F) -> Effect
where
    F: FnMut() -> Option<CleanupFn> + 'static,
{
    let inner = EffectInner::new(Box::new(f));

    register_effect_with_scope(&inner);

    let parent = with_context(|ctx| ctx.active_reaction());
    if let Some(parent) = parent {
        if let Some(parent) = parent.as_any().downcast_ref::<EffectInner>() {
            *inner.parent.borrow_mut() = parent.this.clone();
            parent.children.borrow_mut().push(inner.clone());
        }
    }

    update_effect(&inner);
    Effect { inner }
}

/// Whether reads right now are recorded by some reaction.
pub fn effect_tracking() -> bool {
    crate::core::context::is_tracking()
}
