// ============================================================================
// spark-resettable - Signal Primitive
// The writable reactive cell
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::types::{AnySource, EqualsFn, SourceInner};
use crate::reactivity::tracking::{notify_write, track_read};

/// A reactive cell holding a `T`.
///
/// Cloning the handle shares the cell. Reads inside a derived or effect
/// subscribe it; writes rerun whatever subscribed.
///
/// # Example
///
/// ```
/// use spark_resettable::signal;
///
/// let count = signal(0);
/// count.set(5);
/// count.update(|n| *n += 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: Rc::new(SourceInner::new(value)),
        }
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SourceInner::new_with_equals(value, equals)),
        }
    }

    /// Current value, subscribing the active reaction.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(self.as_any_source());
        self.inner.get()
    }

    /// Borrow the current value, subscribing the active reaction.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.as_any_source());
        self.inner.with(f)
    }

    /// Current value without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    /// Replace the value. Returns whether it changed under the signal's
    /// equality; unchanged writes notify nobody.
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.set(value);
        if changed {
            notify_write(self.as_any_source());
        }
        changed
    }

    /// Mutate the value in place and notify.
    ///
    /// In-place mutation is a nested change: it does not count as a
    /// replacement, so shallow watchers of this signal ignore it.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
        notify_write(self.as_any_source());
    }

    /// How many times the value has been replaced through [`Signal::set`].
    pub fn replace_version(&self) -> u64 {
        self.inner.replace_version()
    }

    pub fn inner(&self) -> &Rc<SourceInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }

    /// Whether both handles share one cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|value| f.debug_struct("Signal").field("value", value).finish())
    }
}

/// Create a signal compared with `PartialEq`.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: PartialEq + 'static,
{
    Signal::new(value)
}

/// Create a signal with a custom equality function.
///
/// # Example
///
/// ```
/// use spark_resettable::{signal_with_equals, structural_eq};
///
/// let tags = signal_with_equals(vec!["a"], structural_eq);
/// assert!(!tags.set(vec!["a"]));
/// assert!(tags.set(vec!["b"]));
/// ```
pub fn signal_with_equals<T: 'static>(value: T, equals: EqualsFn<T>) -> Signal<T> {
    Signal::new_with_equals(value, equals)
}
