// ============================================================================
// spark-resettable - Ergonomic Macros
// ============================================================================

/// Clone the listed handles into the expression, usually a `move` closure.
///
/// ```rust
/// use spark_resettable::{cloned, derived, signal};
///
/// let a = signal(1);
/// let b = signal(2);
/// let sum = derived(cloned!(a, b => move || a.get() + b.get()));
/// assert_eq!(sum.get(), 3);
/// a.set(10);
/// assert_eq!(sum.get(), 12);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// `derived(cloned!(deps => move || body))`.
///
/// ```rust
/// use spark_resettable::signal;
///
/// let a = signal(1);
/// let b = signal(2);
/// let sum = spark_resettable::derived!(a, b => a.get() + b.get());
/// assert_eq!(sum.get(), 3);
/// ```
#[macro_export]
macro_rules! derived {
    ($($deps:ident),+ => $body:expr) => {
        $crate::derived($crate::cloned!($($deps),+ => move || $body))
    };
    ($body:expr) => {
        $crate::derived(move || $body)
    };
}

/// `effect(cloned!(deps => move || body))`.
///
/// ```rust
/// use spark_resettable::{use_resettable, ResettableOptions};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let draft = use_resettable(0, ResettableOptions::default()).unwrap();
/// let dirty = Rc::new(Cell::new(false));
///
/// let _e = spark_resettable::effect!(draft, dirty => dirty.set(draft.is_modified()));
/// draft.set(1).unwrap();
/// assert!(dirty.get());
/// ```
#[macro_export]
macro_rules! effect {
    ($($deps:ident),+ => $body:expr) => {
        $crate::effect($crate::cloned!($($deps),+ => move || { $body; }))
    };
    ($body:expr) => {
        $crate::effect(move || { $body; })
    };
}

/// `watch(source, cloned!(deps => move |new, old| body), options)`.
///
/// The new and old values are bound to the two names in brackets.
///
/// ```rust
/// use spark_resettable::{signal, WatchOptions};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let last = Rc::new(Cell::new(0));
///
/// let _w = spark_resettable::watch!(&count, [new, _old]: i32, last => last.set(*new));
/// count.set(4);
/// assert_eq!(last.get(), 4);
/// ```
#[macro_export]
macro_rules! watch {
    ($source:expr, [$new:tt, $old:tt]: $ty:ty, $($deps:ident),+ => $body:expr) => {
        $crate::watch(
            $source,
            $crate::cloned!($($deps),+ => move |$new: &$ty, $old: Option<&$ty>| { $body; }),
            $crate::WatchOptions::default(),
        )
    };
}
