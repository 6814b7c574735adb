// ============================================================================
// spark-resettable - Graph Types
// Type-erased node traits and the storage behind Signal<T>
// ============================================================================
//
// Graph bookkeeping (status, versions, edges) never needs the value type, so
// nodes are stored as Rc<dyn AnySource> / Weak<dyn AnyReaction>. Only the
// typed handles (Signal<T>, Derived<T>) touch T.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::*;

/// Equality used to decide whether a write is a change.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// `PartialEq` equality.
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// NODE TRAITS
// =============================================================================

/// Something reactions can depend on: signals and deriveds.
pub trait AnySource: Any {
    fn flags(&self) -> u32;
    fn set_flags(&self, flags: u32);

    /// Global write version stamped at the last change.
    fn write_version(&self) -> u32;
    fn set_write_version(&self, version: u32);

    /// Read cycle in which this source was last tracked (dedup).
    fn read_version(&self) -> u32;
    fn set_read_version(&self, version: u32);

    fn reactions(&self) -> &ReactionList;

    fn as_any(&self) -> &dyn Any;

    /// The reaction half of a derived. Signals have none.
    fn as_derived_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        None
    }

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_maybe_dirty(&self) -> bool {
        self.flags() & MAYBE_DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn set_status(&self, status: u32) {
        self.set_flags((self.flags() & STATUS_MASK) | status);
    }
}

/// Something that reruns when its sources change: deriveds and effects.
pub trait AnyReaction: Any {
    fn flags(&self) -> u32;
    fn set_flags(&self, flags: u32);

    fn deps(&self) -> &DepList;

    /// Rerun. For deriveds the return value says whether the value changed.
    fn update(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    /// The source half of a derived. Effects have none.
    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>>;

    /// Global write version when the last run finished. Deps written after
    /// it make a MAYBE_DIRTY reaction rerun.
    fn run_version(&self) -> u32 {
        0
    }

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_maybe_dirty(&self) -> bool {
        self.flags() & MAYBE_DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn is_destroyed(&self) -> bool {
        self.flags() & DESTROYED != 0
    }

    fn set_status(&self, status: u32) {
        self.set_flags((self.flags() & STATUS_MASK) | status);
    }
}

// =============================================================================
// EDGE LISTS
// =============================================================================

/// Downstream edges of a source. Weak so sources never keep reactions alive.
#[derive(Default)]
pub struct ReactionList {
    items: RefCell<Vec<Weak<dyn AnyReaction>>>,
}

impl ReactionList {
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn push(&self, reaction: Weak<dyn AnyReaction>) {
        self.items.borrow_mut().push(reaction);
    }

    /// Live reactions, collected so callers can mutate the graph freely.
    pub fn snapshot(&self) -> Vec<Rc<dyn AnyReaction>> {
        let mut items = self.items.borrow_mut();
        items.retain(|w| w.strong_count() > 0);
        items.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn remove(&self, reaction: &Rc<dyn AnyReaction>) {
        let target = Rc::as_ptr(reaction) as *const ();
        self.items
            .borrow_mut()
            .retain(|w| w.strong_count() > 0 && w.as_ptr() as *const () != target);
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

/// Upstream edges of a reaction, in first-read order.
#[derive(Default)]
pub struct DepList {
    items: RefCell<Vec<Rc<dyn AnySource>>>,
}

impl DepList {
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn push(&self, source: Rc<dyn AnySource>) {
        self.items.borrow_mut().push(source);
    }

    pub fn snapshot(&self) -> Vec<Rc<dyn AnySource>> {
        self.items.borrow().clone()
    }

    /// Drop every dep from `start` on and return the dropped ones.
    pub fn split_off(&self, start: usize) -> Vec<Rc<dyn AnySource>> {
        let mut items = self.items.borrow_mut();
        if start >= items.len() {
            return Vec::new();
        }
        items.split_off(start)
    }

    /// True if any dep was written after `version`.
    pub fn any_newer_than(&self, version: u32) -> bool {
        self.items.borrow().iter().any(|d| d.write_version() > version)
    }
}

// =============================================================================
// SOURCE INNER (the data behind Signal<T>)
// =============================================================================

/// Storage of one signal.
///
/// Besides the usual write version it keeps a replace version which is only
/// bumped by wholesale replacement (`set`), never by in-place mutation
/// (`update`). Shallow watchers compare it to ignore nested mutation.
pub struct SourceInner<T> {
    flags: Cell<u32>,
    value: RefCell<T>,
    write_version: Cell<u32>,
    read_version: Cell<u32>,
    replace_version: Cell<u64>,
    reactions: ReactionList,
    equals: EqualsFn<T>,
}

impl<T> SourceInner<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            flags: Cell::new(SOURCE | CLEAN),
            value: RefCell::new(value),
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            replace_version: Cell::new(0),
            reactions: ReactionList::default(),
            equals,
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value. Returns false (and keeps the old value) when the
    /// equality function says nothing changed.
    pub fn set(&self, value: T) -> bool {
        if (self.equals)(&self.value.borrow(), &value) {
            return false;
        }
        *self.value.borrow_mut() = value;
        self.replace_version.set(self.replace_version.get() + 1);
        true
    }

    /// Mutate in place. Always counts as a change.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
    }

    pub fn replace_version(&self) -> u64 {
        self.replace_version.get()
    }
}

impl<T: 'static> AnySource for SourceInner<T> {
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
}
