// ============================================================================
// spark-resettable - Reactive Context
// Thread-local state shared by every node on this thread
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyReaction, AnySource};

/// Per-thread reactive state.
pub struct ReactiveContext {
    /// Reaction whose reads are currently being tracked
    active_reaction: RefCell<Option<Weak<dyn AnyReaction>>>,

    untracking: Cell<bool>,

    /// Bumped on every change anywhere on this thread
    write_version: Cell<u32>,

    /// Id of the reaction run currently collecting deps
    read_version: Cell<u32>,

    /// Source of fresh run ids; never rewinds
    read_counter: Cell<u32>,

    /// Dependencies collected by the running reaction
    new_deps: RefCell<Vec<Rc<dyn AnySource>>>,

    batch_depth: Cell<u32>,

    /// Effects waiting to run
    pending: RefCell<Vec<Weak<dyn AnyReaction>>>,

    flushing: Cell<bool>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            active_reaction: RefCell::new(None),
            untracking: Cell::new(false),
            write_version: Cell::new(1),
            read_version: Cell::new(0),
            read_counter: Cell::new(0),
            new_deps: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            flushing: Cell::new(false),
        }
    }

    // =========================================================================
    // ACTIVE REACTION
    // =========================================================================

    /// Install `reaction` as the tracking target, returning the previous one.
    pub fn set_active_reaction(
        &self,
        reaction: Option<Weak<dyn AnyReaction>>,
    ) -> Option<Weak<dyn AnyReaction>> {
        self.active_reaction.replace(reaction)
    }

    pub fn active_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        self.active_reaction.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_active_reaction(&self) -> bool {
        self.active_reaction.borrow().is_some()
    }

    pub fn set_untracking(&self, value: bool) -> bool {
        self.untracking.replace(value)
    }

    pub fn is_untracking(&self) -> bool {
        self.untracking.get()
    }

    // =========================================================================
    // VERSIONS
    // =========================================================================

    pub fn next_write_version(&self) -> u32 {
        let v = self.write_version.get().wrapping_add(1);
        self.write_version.set(v);
        v
    }

    pub fn write_version(&self) -> u32 {
        self.write_version.get()
    }

    /// Start a new run id and make it current. Returns the previous one so
    /// nested runs can hand it back with [`ReactiveContext::set_read_version`].
    pub fn next_read_version(&self) -> u32 {
        let v = self.read_counter.get().wrapping_add(1);
        self.read_counter.set(v);
        self.read_version.replace(v)
    }

    pub fn set_read_version(&self, version: u32) {
        self.read_version.set(version);
    }

    pub fn read_version(&self) -> u32 {
        self.read_version.get()
    }

    // =========================================================================
    // DEPENDENCY COLLECTION
    // =========================================================================

    pub fn swap_new_deps(&self, deps: Vec<Rc<dyn AnySource>>) -> Vec<Rc<dyn AnySource>> {
        self.new_deps.replace(deps)
    }

    pub fn push_new_dep(&self, source: Rc<dyn AnySource>) {
        self.new_deps.borrow_mut().push(source);
    }

    pub fn has_new_dep(&self, source: &Rc<dyn AnySource>) -> bool {
        self.new_deps
            .borrow()
            .iter()
            .any(|dep| Rc::ptr_eq(dep, source))
    }

    pub fn new_dep_count(&self) -> usize {
        self.new_deps.borrow().len()
    }

    // =========================================================================
    // BATCHING AND FLUSHING
    // =========================================================================

    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn batch_depth(&self) -> u32 {
        self.batch_depth.get()
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub fn push_pending(&self, reaction: Weak<dyn AnyReaction>) {
        self.pending.borrow_mut().push(reaction);
    }

    pub fn take_pending(&self) -> Vec<Weak<dyn AnyReaction>> {
        self.pending.take()
    }

    pub fn set_flushing(&self, value: bool) -> bool {
        self.flushing.replace(value)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Run `f` against this thread's reactive context.
///
/// Never call back into the reactive graph from inside `f`: the closure must
/// only touch the context itself.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Inside a reaction and not untracking.
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction() && !ctx.is_untracking())
}

pub fn is_untracking() -> bool {
    with_context(|ctx| ctx.is_untracking())
}

pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}
