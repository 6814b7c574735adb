// ============================================================================
// spark-resettable - MaybeSignal
// A value, an accessor or a reactive cell, read through one interface
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::primitives::derived::Derived;
use crate::primitives::signal::Signal;
use crate::reactivity::batching::untrack;

/// Anything that can produce a `T`: a plain value, a zero-argument accessor,
/// a signal or a derived.
///
/// APIs taking `impl Into<MaybeSignal<T>>` accept all of these, so callers
/// can pass whatever form they have on hand.
///
/// # Example
///
/// ```
/// use spark_resettable::{signal, MaybeSignal};
///
/// let count = signal(3);
/// let sources: Vec<MaybeSignal<i32>> = vec![
///     7.into(),
///     MaybeSignal::getter(|| 40 + 2),
///     (&count).into(),
/// ];
/// let values: Vec<i32> = sources.iter().map(MaybeSignal::to_value).collect();
/// assert_eq!(values, vec![7, 42, 3]);
/// ```
pub enum MaybeSignal<T: 'static> {
    Static(T),
    Getter(Rc<dyn Fn() -> T>),
    Signal(Signal<T>),
    Derived(Derived<T>),
}

impl<T: 'static> MaybeSignal<T> {
    pub fn getter(f: impl Fn() -> T + 'static) -> Self {
        MaybeSignal::Getter(Rc::new(f))
    }

    /// Resolve to a plain value without subscribing the active reaction.
    pub fn to_value(&self) -> T
    where
        T: Clone,
    {
        match self {
            MaybeSignal::Static(v) => v.clone(),
            MaybeSignal::Getter(f) => untrack(|| f()),
            MaybeSignal::Signal(s) => s.peek(),
            MaybeSignal::Derived(d) => d.peek(),
        }
    }

    /// Resolve to a plain value, subscribing the active reaction to whatever
    /// the source reads.
    pub fn track(&self) -> T
    where
        T: Clone,
    {
        match self {
            MaybeSignal::Static(v) => v.clone(),
            MaybeSignal::Getter(f) => f(),
            MaybeSignal::Signal(s) => s.get(),
            MaybeSignal::Derived(d) => d.get(),
        }
    }

    /// False only for `Static`.
    pub fn is_reactive(&self) -> bool {
        !matches!(self, MaybeSignal::Static(_))
    }

    pub fn as_signal(&self) -> Option<&Signal<T>> {
        match self {
            MaybeSignal::Signal(s) => Some(s),
            _ => None,
        }
    }
}

impl<T: Clone + 'static> Clone for MaybeSignal<T> {
    fn clone(&self) -> Self {
        match self {
            MaybeSignal::Static(v) => MaybeSignal::Static(v.clone()),
            MaybeSignal::Getter(f) => MaybeSignal::Getter(f.clone()),
            MaybeSignal::Signal(s) => MaybeSignal::Signal(s.clone()),
            MaybeSignal::Derived(d) => MaybeSignal::Derived(d.clone()),
        }
    }
}

impl<T: Default + 'static> Default for MaybeSignal<T> {
    fn default() -> Self {
        MaybeSignal::Static(T::default())
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for MaybeSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaybeSignal::Static(v) => f.debug_tuple("Static").field(v).finish(),
            MaybeSignal::Getter(_) => f.write_str("Getter(..)"),
            MaybeSignal::Signal(s) => f.debug_tuple("Signal").field(&s.peek()).finish(),
            MaybeSignal::Derived(d) => f.debug_tuple("Derived").field(&d.peek()).finish(),
        }
    }
}

impl<T: 'static> From<T> for MaybeSignal<T> {
    fn from(value: T) -> Self {
        MaybeSignal::Static(value)
    }
}

impl<T: 'static> From<Signal<T>> for MaybeSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        MaybeSignal::Signal(signal)
    }
}

impl<T: 'static> From<&Signal<T>> for MaybeSignal<T> {
    fn from(signal: &Signal<T>) -> Self {
        MaybeSignal::Signal(signal.clone())
    }
}

impl<T: 'static> From<Derived<T>> for MaybeSignal<T> {
    fn from(derived: Derived<T>) -> Self {
        MaybeSignal::Derived(derived)
    }
}

impl<T: 'static> From<&Derived<T>> for MaybeSignal<T> {
    fn from(derived: &Derived<T>) -> Self {
        MaybeSignal::Derived(derived.clone())
    }
}

impl From<&str> for MaybeSignal<String> {
    fn from(value: &str) -> Self {
        MaybeSignal::Static(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::derived::derived;
    use crate::primitives::effect::effect;
    use crate::primitives::signal::signal;
    use std::cell::Cell;

    #[test]
    fn every_form_resolves() {
        let s = signal(2);
        let d = derived({
            let s = s.clone();
            move || s.get() * 10
        });

        assert_eq!(MaybeSignal::from(1).to_value(), 1);
        assert_eq!(MaybeSignal::getter(|| 5).to_value(), 5);
        assert_eq!(MaybeSignal::<i32>::from(&s).to_value(), 2);
        assert_eq!(MaybeSignal::<i32>::from(&d).to_value(), 20);
        assert_eq!(MaybeSignal::<String>::from("hi").to_value(), "hi");
    }

    #[test]
    fn to_value_does_not_subscribe_but_track_does() {
        let s = signal(0);
        let untracked = MaybeSignal::getter({
            let s = s.clone();
            move || s.get()
        });
        let tracked = untracked.clone();

        let quiet_runs = Rc::new(Cell::new(0));
        let _quiet = effect({
            let runs = quiet_runs.clone();
            move || {
                untracked.to_value();
                runs.set(runs.get() + 1);
            }
        });
        let loud_runs = Rc::new(Cell::new(0));
        let _loud = effect({
            let runs = loud_runs.clone();
            move || {
                tracked.track();
                runs.set(runs.get() + 1);
            }
        });

        s.set(1);
        assert_eq!(quiet_runs.get(), 1);
        assert_eq!(loud_runs.get(), 2);
    }

    #[test]
    fn reactivity_and_signal_access() {
        let s = signal(1);
        assert!(!MaybeSignal::from(1).is_reactive());
        assert!(MaybeSignal::getter(|| 1).is_reactive());

        let source = MaybeSignal::<i32>::from(s.clone());
        assert!(source.as_signal().is_some_and(|inner| inner.ptr_eq(&s)));
        assert!(MaybeSignal::from(1).as_signal().is_none());
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", MaybeSignal::from(3)), "Static(3)");
        assert_eq!(format!("{:?}", MaybeSignal::getter(|| 3)), "Getter(..)");
        assert_eq!(format!("{:?}", MaybeSignal::<i32>::from(signal(3))), "Signal(3)");
    }
}
