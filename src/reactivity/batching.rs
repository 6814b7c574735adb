// ============================================================================
// spark-resettable - Batching
// Coalescing writes and reading without subscribing
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::scheduling::flush_sync;

/// Run `f` with effect flushing deferred until the outermost batch ends.
///
/// Writes inside the batch take effect immediately for readers; only the
/// effects they dirty wait, and each of them runs at most once.
///
/// # Example
///
/// ```
/// use spark_resettable::{batch, effect, use_resettable, ResettableOptions};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let title = use_resettable("draft".to_string(), ResettableOptions::default()).unwrap();
/// let flips = Rc::new(RefCell::new(Vec::new()));
///
/// let _e = effect({
///     let (title, flips) = (title.clone(), flips.clone());
///     move || flips.borrow_mut().push(title.is_modified())
/// });
///
/// // The edit and the undo settle before the effect looks, and the flag
/// // ends where it started, so the effect does not rerun
/// batch(|| {
///     title.set("final").unwrap();
///     title.reset().unwrap();
/// });
///
/// assert_eq!(*flips.borrow(), vec![false]);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            // A flush already running picks up whatever this batch queued
            let outermost = with_context(|ctx| ctx.exit_batch() == 0 && !ctx.is_flushing());
            if outermost && !std::thread::panicking() {
                flush_sync();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

/// Run `f` without registering any of its reads as dependencies.
///
/// # Example
///
/// ```
/// use spark_resettable::{effect, signal, untrack};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _e = effect({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         a.get();
///         untrack(|| b.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// b.set(20);
/// assert_eq!(runs.get(), 1);
/// a.set(10);
/// assert_eq!(runs.get(), 2);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev = with_context(|ctx| ctx.set_untracking(true));

    struct UntrackGuard(bool);

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.0));
        }
    }

    let _guard = UntrackGuard(prev);
    f()
}

/// Alias for [`untrack`].
pub fn peek<T>(f: impl FnOnce() -> T) -> T {
    untrack(f)
}
