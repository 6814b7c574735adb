// ============================================================================
// spark-resettable - Derived Values
// Lazy memoized computations over other reactive cells
// ============================================================================
//
// A derived is a source (others read it) and a reaction (it reads others) at
// the same time. Writes upstream only mark it; the computation runs on the
// next read, walking the chain of stale deriveds from the deepest one up.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{default_equals, AnyReaction, AnySource, DepList, EqualsFn, ReactionList};
use crate::reactivity::tracking::{install_dependencies, track_read};

// =============================================================================
// DERIVED INNER
// =============================================================================

pub struct DerivedInner<T> {
    flags: Cell<u32>,
    func: Box<dyn Fn() -> T>,
    /// None until the first computation
    value: RefCell<Option<T>>,
    equals: EqualsFn<T>,
    write_version: Cell<u32>,
    read_version: Cell<u32>,
    reactions: ReactionList,
    deps: DepList,
    this: Weak<DerivedInner<T>>,
}

impl<T: 'static> DerivedInner<T> {
    pub fn new_with_equals(func: impl Fn() -> T + 'static, equals: EqualsFn<T>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            flags: Cell::new(DERIVED | DIRTY),
            func: Box::new(func),
            value: RefCell::new(None),
            equals,
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            reactions: ReactionList::default(),
            deps: DepList::default(),
            this: this.clone(),
        })
    }

    /// Run the computation and store the result if it differs.
    fn compute(&self) -> bool {
        let next = (self.func)();
        let changed = match self.value.borrow().as_ref() {
            Some(current) => !(self.equals)(current, &next),
            None => true,
        };

        if changed {
            *self.value.borrow_mut() = Some(next);
            self.write_version
                .set(with_context(|ctx| ctx.next_write_version()));
        }
        changed
    }

    pub fn is_initialized(&self) -> bool {
        self.value.borrow().is_some()
    }
}

impl<T: 'static> AnySource for DerivedInner<T> {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn write_version(&self) -> u32 {
        self.write_version.get()
    }

    fn set_write_version(&self, version: u32) {
        self.write_version.set(version);
    }

    fn read_version(&self) -> u32 {
        self.read_version.get()
    }

    fn set_read_version(&self, version: u32) {
        self.read_version.set(version);
    }

    fn reactions(&self) -> &ReactionList {
        &self.reactions
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_derived_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        self.this.upgrade().map(|rc| rc as Rc<dyn AnyReaction>)
    }
}

impl<T: 'static> AnyReaction for DerivedInner<T> {
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
        self.compute()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
        self.this.upgrade().map(|rc| rc as Rc<dyn AnySource>)
    }
}

// =============================================================================
// DERIVED<T>
// =============================================================================

/// A memoized computed value.
///
/// # Example
///
/// ```
/// use spark_resettable::{derived, signal};
///
/// let count = signal(1);
/// let doubled = derived({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// assert_eq!(doubled.get(), 2);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Derived<T> {
    /// Borrow the up-to-date value, subscribing the active reaction.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        update_derived_chain(self.as_any_source());
        track_read(self.as_any_source());
        self.read_cached(f)
    }

    /// Up-to-date value, subscribing the active reaction.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Up-to-date value without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        update_derived_chain(self.as_any_source());
        self.read_cached(T::clone)
    }

    fn read_cached<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.borrow();
        match value.as_ref() {
            Some(v) => f(v),
            None => unreachable!("derived is computed before it is read"),
        }
    }

    pub fn inner(&self) -> &Rc<DerivedInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }

    pub fn as_any_reaction(&self) -> Rc<dyn AnyReaction> {
        self.inner.clone()
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived").field("value", &self.peek()).finish()
    }
}

/// Create a derived compared with `PartialEq`.
pub fn derived<T, F>(func: F) -> Derived<T>
where
    T: PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    derived_with_equals(func, default_equals)
}

/// Create a derived with a custom equality function.
pub fn derived_with_equals<T, F>(func: F, equals: EqualsFn<T>) -> Derived<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Derived {
        inner: DerivedInner::new_with_equals(func, equals),
    }
}

// =============================================================================
// CHAIN UPDATE
// =============================================================================

/// Bring `target` and every stale derived it reads up to date.
///
/// Stale deriveds are collected breadth first from `target` toward the
/// sources, then processed deepest first. DIRTY ones always recompute;
/// MAYBE_DIRTY ones only when a dep was written after their own last write.
pub fn update_derived_chain(target: Rc<dyn AnySource>) {
    if target.flags() & (DIRTY | MAYBE_DIRTY) == 0 {
        return;
    }

    let mut chain: Vec<Rc<dyn AnySource>> = vec![target.clone()];
    let mut seen: Vec<*const ()> = vec![Rc::as_ptr(&target) as *const ()];
    let mut idx = 0;

    while idx < chain.len() {
        let current = chain[idx].clone();
        idx += 1;

        let Some(reaction) = current.as_derived_reaction() else {
            continue;
        };
        for dep in reaction.deps().snapshot() {
            let flags = dep.flags();
            if flags & DERIVED == 0 || flags & (DIRTY | MAYBE_DIRTY) == 0 {
                continue;
            }
            let ptr = Rc::as_ptr(&dep) as *const ();
            if !seen.contains(&ptr) {
                seen.push(ptr);
                chain.push(dep);
            }
        }
    }

    for node in chain.iter().rev() {
        let flags = node.flags();
        if flags & DIRTY != 0 {
            update_derived(node);
        } else if flags & MAYBE_DIRTY != 0 {
            let stale = node
                .as_derived_reaction()
                .is_some_and(|r| r.deps().any_newer_than(node.write_version()));
            if stale {
                update_derived(node);
            } else {
                node.set_status(CLEAN);
            }
        }
    }
}

/// Recompute one derived with dependency collection.
fn update_derived(source: &Rc<dyn AnySource>) {
    let Some(reaction) = source.as_derived_reaction() else {
        return;
    };

    let (prev_reaction, prev_deps, prev_run) = with_context(|ctx| {
        let prev_reaction = ctx.set_active_reaction(Some(Rc::downgrade(&reaction)));
        let prev_deps = ctx.swap_new_deps(Vec::new());
        let prev_run = ctx.next_read_version();
        (prev_reaction, prev_deps, prev_run)
    });

    reaction.set_flags(reaction.flags() | REACTION_IS_UPDATING);
    reaction.update();
    reaction.set_flags(reaction.flags() & !REACTION_IS_UPDATING);

    let new_deps = with_context(|ctx| {
        ctx.set_active_reaction(prev_reaction);
        ctx.set_read_version(prev_run);
        ctx.swap_new_deps(prev_deps)
    });

    install_dependencies(&reaction, new_deps);
    source.set_status(CLEAN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn computes_lazily_and_caches() {
        let runs = counter();
        let d = derived({
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                42
            }
        });

        assert_eq!(runs.get(), 0);
        assert!(!d.inner().is_initialized());
        assert_eq!(d.get(), 42);
        assert_eq!(d.get(), 42);
        assert_eq!(runs.get(), 1);
        assert!(d.inner().is_initialized());
    }

    #[test]
    fn recomputes_after_dependency_change() {
        let a = signal(1);
        let d = derived({
            let a = a.clone();
            move || a.get() * 2
        });
        assert_eq!(d.get(), 2);
        a.set(4);
        assert_eq!(d.get(), 8);
    }

    #[test]
    fn in_place_update_invalidates() {
        let items = signal(vec![1]);
        let len = derived({
            let items = items.clone();
            move || items.with(Vec::len)
        });
        assert_eq!(len.get(), 1);
        items.update(|v| v.push(2));
        assert_eq!(len.get(), 2);
    }

    #[test]
    fn unchanged_intermediate_skips_downstream() {
        let a = signal(0);
        let bucket = derived({
            let a = a.clone();
            move || a.get() / 10
        });
        let runs = counter();
        let label = derived({
            let bucket = bucket.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                format!("bucket {}", bucket.get())
            }
        });

        assert_eq!(label.get(), "bucket 0");
        a.set(5);
        assert_eq!(label.get(), "bucket 0");
        assert_eq!(runs.get(), 1);

        a.set(15);
        assert_eq!(label.get(), "bucket 1");
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn diamond_computes_bottom_once() {
        let a = signal(1);
        let b = derived({
            let a = a.clone();
            move || a.get() + 10
        });
        let c = derived({
            let a = a.clone();
            move || a.get() * 10
        });
        let runs = counter();
        let d = derived({
            let (b, c, runs) = (b.clone(), c.clone(), runs.clone());
            move || {
                runs.set(runs.get() + 1);
                b.get() + c.get()
            }
        });

        assert_eq!(d.get(), 21);
        a.set(2);
        assert_eq!(d.get(), 32);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn marks_cascade_through_chain() {
        let a = signal(1);
        let b = derived({
            let a = a.clone();
            move || a.get() * 2
        });
        let c = derived({
            let b = b.clone();
            move || b.get() + 1
        });
        assert_eq!(c.get(), 3);

        a.set(2);
        assert!(AnySource::is_dirty(&**b.inner()));
        assert!(AnySource::is_maybe_dirty(&**c.inner()));

        assert_eq!(c.get(), 5);
        assert!(AnySource::is_clean(&**b.inner()));
        assert!(AnySource::is_clean(&**c.inner()));
    }

    #[test]
    fn peek_does_not_subscribe() {
        let a = signal(1);
        let d = derived({
            let a = a.clone();
            move || a.get()
        });
        let outer = derived({
            let d = d.clone();
            move || d.peek() + 100
        });
        assert_eq!(outer.get(), 101);
        a.set(2);
        assert_eq!(outer.get(), 101);
        assert_eq!(d.get(), 2);
    }

    #[test]
    fn dependencies_follow_branches() {
        let flag = signal(true);
        let x = signal(1);
        let y = signal(2);
        let d = derived({
            let (flag, x, y) = (flag.clone(), x.clone(), y.clone());
            move || if flag.get() { x.get() } else { y.get() }
        });

        assert_eq!(d.get(), 1);
        assert_eq!(y.as_any_source().reactions().len(), 0);

        flag.set(false);
        assert_eq!(d.get(), 2);
        assert_eq!(x.as_any_source().reactions().len(), 0);
        assert_eq!(y.as_any_source().reactions().len(), 1);
    }

    #[test]
    #[should_panic(expected = "Cannot write to signals inside a derived")]
    fn writing_from_derived_panics() {
        let a = signal(0);
        let d = derived({
            let a = a.clone();
            move || {
                a.set(1);
                0
            }
        });
        d.get();
    }
}
