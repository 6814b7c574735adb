// ============================================================================
// spark-resettable - Watch
// Callbacks on observed changes of a single source
// ============================================================================
//
// A watcher is an effect that only tracks its source. The callback itself
// runs untracked, so whatever it reads or writes never feeds back into the
// watcher's dependencies.
//
// Granularity:
// - shallow on a signal: fires when the signal is replaced via `set`, never
//   for in-place `update`
// - deep on a signal: fires for every write, nested mutation included
// - anything else: fires when the produced value serializes differently
//   from the previous one, which already covers nested changes
// ============================================================================

use serde::Serialize;

use crate::primitives::effect::{effect, Effect};
use crate::primitives::maybe::MaybeSignal;
use crate::reactivity::batching::untrack;
use crate::reactivity::equality::structural_eq;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Fire on nested mutation too, not only on replacement.
    pub deep: bool,
    /// Fire once at creation with the current value and no old value.
    pub immediate: bool,
}

impl WatchOptions {
    pub fn deep() -> Self {
        Self {
            deep: true,
            immediate: false,
        }
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

/// Keeps a watcher alive.
///
/// Dropping the handle stops the watcher unless an [`EffectScope`] or a
/// parent effect owns it, in which case it stops with its owner.
///
/// [`EffectScope`]: crate::EffectScope
#[derive(Debug)]
pub struct WatchHandle {
    effect: Effect,
}

impl WatchHandle {
    pub fn stop(&self) {
        self.effect.dispose();
    }

    pub fn is_stopped(&self) -> bool {
        self.effect.is_destroyed()
    }
}

/// Call `callback(new, old)` whenever `source` changes.
///
/// # Example
///
/// ```
/// use spark_resettable::{signal, watch, WatchOptions};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let items = signal(vec![1]);
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let _shallow = watch(&items, {
///     let log = log.clone();
///     move |new: &Vec<i32>, _old: Option<&Vec<i32>>| log.borrow_mut().push(("shallow", new.len()))
/// }, WatchOptions::default());
/// let _deep = watch(&items, {
///     let log = log.clone();
///     move |new: &Vec<i32>, _old: Option<&Vec<i32>>| log.borrow_mut().push(("deep", new.len()))
/// }, WatchOptions::deep());
///
/// items.update(|v| v.push(2));
/// items.set(vec![]);
///
/// assert_eq!(
///     *log.borrow(),
///     vec![("deep", 2), ("shallow", 0), ("deep", 0)]
/// );
/// ```
pub fn watch<T, F>(
    source: impl Into<MaybeSignal<T>>,
    mut callback: F,
    options: WatchOptions,
) -> WatchHandle
where
    T: Clone + Serialize + 'static,
    F: FnMut(&T, Option<&T>) + 'static,
{
    let source = source.into();
    let mut previous: Option<T> = None;
    let mut seen_replace = source.as_signal().map(|s| s.replace_version());

    let effect = effect(move || {
        let next = source.track();

        let fire = match (previous.as_ref(), source.as_signal()) {
            (None, _) => options.immediate,
            (Some(_), Some(signal)) => {
                let replaced = signal.replace_version();
                let fire = options.deep || seen_replace != Some(replaced);
                seen_replace = Some(replaced);
                fire
            }
            (Some(prev), None) => !structural_eq(prev, &next),
        };

        if fire {
            tracing::trace!(deep = options.deep, "watch callback fired");
            untrack(|| callback(&next, previous.as_ref()));
        }
        previous = Some(next);
    });

    WatchHandle { effect }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::derived::derived;
    use crate::primitives::scope::effect_scope;
    use crate::primitives::signal::signal;
    use crate::reactivity::batching::batch;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log<T> = Rc<RefCell<Vec<(T, Option<T>)>>>;

    fn recorder<T: Clone + 'static>() -> (Log<T>, impl FnMut(&T, Option<&T>) + 'static) {
        let log: Log<T> = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |new: &T, old: Option<&T>| {
            sink.borrow_mut().push((new.clone(), old.cloned()))
        })
    }

    #[test]
    fn fires_with_new_and_old() {
        let s = signal(1);
        let (log, cb) = recorder::<i32>();
        let _w = watch(&s, cb, WatchOptions::default());

        assert!(log.borrow().is_empty());
        s.set(2);
        s.set(3);
        assert_eq!(*log.borrow(), vec![(2, Some(1)), (3, Some(2))]);
    }

    #[test]
    fn immediate_fires_at_creation() {
        let s = signal("a".to_string());
        let (log, cb) = recorder::<String>();
        let _w = watch(&s, cb, WatchOptions::default().immediate(true));
        assert_eq!(*log.borrow(), vec![("a".to_string(), None)]);
    }

    #[test]
    fn shallow_signal_ignores_in_place_update() {
        let s = signal(vec![1]);
        let (log, cb) = recorder::<Vec<i32>>();
        let _w = watch(&s, cb, WatchOptions::default());

        s.update(|v| v.push(2));
        assert!(log.borrow().is_empty());

        s.set(vec![9]);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].0, vec![9]);
    }

    #[test]
    fn deep_signal_sees_in_place_update() {
        let s = signal(vec![1]);
        let (log, cb) = recorder::<Vec<i32>>();
        let _w = watch(&s, cb, WatchOptions::deep());

        s.update(|v| v.push(2));
        assert_eq!(*log.borrow(), vec![(vec![1, 2], Some(vec![1]))]);
    }

    #[test]
    fn getter_source_fires_on_structural_change_only() {
        let a = signal(1);
        let b = signal(100);
        let (log, cb) = recorder::<(i32, i32)>();
        let _w = watch(
            MaybeSignal::getter({
                let (a, b) = (a.clone(), b.clone());
                move || (a.get() % 2, b.get())
            }),
            cb,
            WatchOptions::default(),
        );

        a.set(3);
        assert!(log.borrow().is_empty());
        b.set(200);
        assert_eq!(*log.borrow(), vec![((1, 200), Some((1, 100)))]);
    }

    #[test]
    fn derived_source() {
        let a = signal(2);
        let d = derived({
            let a = a.clone();
            move || a.get() * 2
        });
        let (log, cb) = recorder::<i32>();
        let _w = watch(&d, cb, WatchOptions::default());
        a.set(5);
        assert_eq!(*log.borrow(), vec![(10, Some(4))]);
    }

    #[test]
    fn deep_derived_ignores_equal_recompute() {
        let n = signal(2);
        let parity = derived({
            let n = n.clone();
            move || n.get() % 2
        });
        let (log, cb) = recorder::<i32>();
        let _w = watch(&parity, cb, WatchOptions::deep());

        n.set(4);
        assert!(log.borrow().is_empty());
        n.set(7);
        assert_eq!(*log.borrow(), vec![(1, Some(0))]);
    }

    #[test]
    fn deep_getter_fires_on_nested_change_only() {
        let items = signal(vec![1]);
        let noise = signal(0);
        let (log, cb) = recorder::<Vec<i32>>();
        let _w = watch(
            MaybeSignal::getter({
                let (items, noise) = (items.clone(), noise.clone());
                move || {
                    noise.get();
                    items.get()
                }
            }),
            cb,
            WatchOptions::deep(),
        );

        noise.set(1);
        assert!(log.borrow().is_empty());
        items.update(|v| v.push(2));
        assert_eq!(*log.borrow(), vec![(vec![1, 2], Some(vec![1]))]);
    }

    #[test]
    fn batched_changes_fire_once() {
        let s = signal(0);
        let (log, cb) = recorder::<i32>();
        let _w = watch(&s, cb, WatchOptions::default());
        batch(|| {
            s.set(1);
            s.set(2);
        });
        assert_eq!(*log.borrow(), vec![(2, Some(0))]);
    }

    #[test]
    fn callback_reads_are_not_tracked() {
        let s = signal(0);
        let other = signal(0);
        let calls = Rc::new(RefCell::new(0));
        let _w = watch(
            &s,
            {
                let (other, calls) = (other.clone(), calls.clone());
                move |_: &i32, _: Option<&i32>| {
                    other.get();
                    *calls.borrow_mut() += 1;
                }
            },
            WatchOptions::default(),
        );
        s.set(1);
        other.set(1);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn stop_and_drop_end_the_watch() {
        let s = signal(0);
        let (log, cb) = recorder::<i32>();
        let w = watch(&s, cb, WatchOptions::default());
        w.stop();
        assert!(w.is_stopped());
        s.set(1);

        let (dropped_log, cb) = recorder::<i32>();
        drop(watch(&s, cb, WatchOptions::default()));
        s.set(2);

        assert!(log.borrow().is_empty());
        assert!(dropped_log.borrow().is_empty());
    }

    #[test]
    fn scope_owns_watchers() {
        let s = signal(0);
        let (log, cb) = recorder::<i32>();
        let scope = effect_scope(false);
        scope.run(|| {
            watch(&s, cb, WatchOptions::default());
        });

        s.set(1);
        scope.stop();
        s.set(2);
        assert_eq!(*log.borrow(), vec![(1, Some(0))]);
    }
}
