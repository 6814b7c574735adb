// ============================================================================
// spark-resettable - Resettable Tracker
// A live value tracked against an original snapshot
// ============================================================================
//
// Two signals hold detached snapshots: `value` is what the user edits,
// `original` is the baseline it is compared with. A derived flags whether
// they differ structurally. Optionally a watch source pushes external changes
// into `value`, and by default into `original` as well.
//
// Every write goes through `clone_plain`, so nothing handed to the tracker is
// ever shared with it afterwards.
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::config::ResettableConfig;
use crate::error::{Error, Result};
use crate::primitives::derived::{derived, Derived};
use crate::primitives::maybe::MaybeSignal;
use crate::primitives::signal::{signal, signal_with_equals, Signal};
use crate::primitives::watch::{watch, WatchHandle, WatchOptions};
use crate::reactivity::batching::batch;
use crate::reactivity::equality::{structural_eq, try_structural_eq};
use crate::snapshot::{clone_plain, snapshot, PlainData};

// =============================================================================
// ORIGINAL
// =============================================================================

/// The baseline side of a [`Resettable`].
///
/// Reads behave like a signal. Writes through this handle are refused with
/// [`Error::Frozen`] when the tracker freezes its original; the tracker's own
/// operations (`reset_to`, source sync) always go through.
pub struct Original<T: 'static> {
    cell: Signal<T>,
    frozen: bool,
}

impl<T: 'static> Clone for Original<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            frozen: self.frozen,
        }
    }
}

impl<T: PlainData> Original<T> {
    fn new(value: T, frozen: bool) -> Self {
        Self {
            cell: signal_with_equals(value, structural_eq::<T>),
            frozen,
        }
    }

    /// Current baseline, subscribing the active reaction.
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Borrow the baseline, subscribing the active reaction.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Current baseline without subscribing.
    pub fn peek(&self) -> T {
        self.cell.peek()
    }

    /// Whether writes through this handle are refused.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Replace the baseline. Returns whether it changed.
    pub fn try_set(&self, value: T) -> Result<bool> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        Ok(self.cell.set(value))
    }

    /// Mutate the baseline in place.
    pub fn try_update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        self.cell.update(f);
        Ok(())
    }

    /// Write that bypasses the freeze.
    fn write(&self, value: T) {
        self.cell.set(value);
    }

    fn snapshot(&self) -> Result<T> {
        self.cell.inner().with(clone_plain)
    }
}

impl<T: PlainData + fmt::Debug> fmt::Debug for Original<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Original")
            .field("value", &self.cell.peek())
            .field("frozen", &self.frozen)
            .finish()
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Construction options for [`use_resettable`].
///
/// # Example
///
/// ```
/// use spark_resettable::{signal, ResettableConfig, ResettableOptions};
///
/// let upstream = signal(0);
/// let options = ResettableOptions::<i32>::from_config(ResettableConfig {
///     freeze_original: true,
///     ..ResettableConfig::default()
/// })
/// .watch_source(&upstream)
/// .deep_watch(true);
///
/// assert!(options.config().freeze_original);
/// assert!(options.config().deep_watch);
/// assert!(options.has_watch_source());
/// ```
pub struct ResettableOptions<T: 'static> {
    watch_source: Option<MaybeSignal<T>>,
    config: ResettableConfig,
}

impl<T: 'static> Default for ResettableOptions<T> {
    fn default() -> Self {
        Self::from_config(ResettableConfig::default())
    }
}

impl<T: 'static> ResettableOptions<T> {
    /// No watch source, default knobs.
    pub fn new() -> Self {
        Self::default()
    }

    /// No watch source, knobs taken from `config`.
    pub fn from_config(config: ResettableConfig) -> Self {
        Self {
            watch_source: None,
            config,
        }
    }

    /// Replace the static knobs, keeping the watch source.
    pub fn with_config(mut self, config: ResettableConfig) -> Self {
        self.config = config;
        self
    }

    /// Follow `source`: each observed change is copied into the tracker.
    pub fn watch_source(mut self, source: impl Into<MaybeSignal<T>>) -> Self {
        self.watch_source = Some(source.into());
        self
    }

    /// Whether a source change also replaces the original. Defaults to true.
    pub fn sync_original_on_source_change(mut self, sync: bool) -> Self {
        self.config.sync_original_on_source_change = sync;
        self
    }

    /// Also follow in-place mutation of a signal source.
    pub fn deep_watch(mut self, deep: bool) -> Self {
        self.config.deep_watch = deep;
        self
    }

    /// Refuse writes through the [`Original`] handle.
    pub fn freeze_original(mut self, freeze: bool) -> Self {
        self.config.freeze_original = freeze;
        self
    }

    /// The static knobs collected so far.
    pub fn config(&self) -> ResettableConfig {
        self.config
    }

    pub fn has_watch_source(&self) -> bool {
        self.watch_source.is_some()
    }
}

// =============================================================================
// RESETTABLE
// =============================================================================

struct Inner<T: 'static> {
    value: Signal<T>,
    original: Original<T>,
    modified: Derived<Result<bool>>,
    sync_error: Signal<Option<Error>>,
    config: ResettableConfig,
    watcher: Option<WatchHandle>,
}

impl<T: 'static> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}

/// A live value with an original to compare against and reset to.
///
/// Clones share the same state. The source watcher, if any, stops when the
/// last clone is dropped, when [`Resettable::stop`] is called, or when the
/// enclosing [`EffectScope`](crate::EffectScope) stops.
///
/// # Example
///
/// ```
/// use spark_resettable::{use_resettable, ResettableOptions};
///
/// let name = use_resettable("hello".to_string(), ResettableOptions::default()).unwrap();
/// assert!(!name.is_modified());
///
/// name.set("world").unwrap();
/// assert!(name.is_modified());
///
/// name.reset().unwrap();
/// assert_eq!(name.value().get(), "hello");
/// assert!(!name.is_modified());
/// ```
pub struct Resettable<T: 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: 'static> Clone for Resettable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: PlainData> Resettable<T> {
    /// See [`use_resettable`].
    pub fn new(
        initial: impl Into<MaybeSignal<T>>,
        options: ResettableOptions<T>,
    ) -> Result<Self> {
        let ResettableOptions {
            watch_source,
            config,
        } = options;

        let initial = initial.into();
        let original = Original::new(snapshot(&initial)?, config.freeze_original);
        let value = signal_with_equals(snapshot(&initial)?, structural_eq::<T>);

        let modified = derived({
            let value = value.clone();
            let original = original.cell.clone();
            move || {
                value
                    .with(|v| original.with(|o| try_structural_eq(v, o)))
                    .map(|equal| !equal)
            }
        });

        let sync_error = signal(None);

        let watcher = watch_source.map(|source| {
            let (value, original, sync_error) = (value.clone(), original.clone(), sync_error.clone());
            watch(
                source,
                move |next: &T, _: Option<&T>| {
                    sync_from_source(next, &value, &original, &sync_error, config);
                },
                WatchOptions {
                    deep: config.deep_watch,
                    immediate: false,
                },
            )
        });

        tracing::debug!(
            watching = watcher.is_some(),
            sync_original = config.sync_original_on_source_change,
            deep_watch = config.deep_watch,
            freeze_original = config.freeze_original,
            "resettable created"
        );

        Ok(Self {
            inner: Rc::new(Inner {
                value,
                original,
                modified,
                sync_error,
                config,
                watcher,
            }),
        })
    }

    /// The live value. Reads and writes on it are reactive.
    pub fn value(&self) -> Signal<T> {
        self.inner.value.clone()
    }

    pub fn original(&self) -> Original<T> {
        self.inner.original.clone()
    }

    /// Put a fresh copy of the original back into the value.
    pub fn reset(&self) -> Result<()> {
        let next = self.inner.original.snapshot()?;
        let changed = self.inner.value.set(next);
        tracing::trace!(changed, "resettable reset");
        Ok(())
    }

    /// Make a copy of `new_original` the new original and reset the value to
    /// it. Both writes land in one batch.
    ///
    /// # Errors
    ///
    /// Snapshot failures are returned before anything is written.
    pub fn reset_to(&self, new_original: impl Into<MaybeSignal<T>>) -> Result<()> {
        let next_original = snapshot(&new_original.into())?;
        let next_value = clone_plain(&next_original)?;

        batch(|| {
            self.inner.original.write(next_original);
            self.inner.value.set(next_value);
        });
        tracing::debug!("resettable original redefined");
        Ok(())
    }

    /// Replace the value with a copy of `new_value`, leaving the original.
    pub fn set(&self, new_value: impl Into<MaybeSignal<T>>) -> Result<()> {
        let next = snapshot(&new_value.into())?;
        let changed = self.inner.value.set(next);
        tracing::trace!(changed, "resettable value replaced");
        Ok(())
    }

    /// Whether value and original differ. Subscribes the active reaction.
    ///
    /// A comparison that fails to serialize counts as modified; use
    /// [`Resettable::try_is_modified`] to see the failure.
    pub fn is_modified(&self) -> bool {
        self.inner.modified.get().unwrap_or(true)
    }

    pub fn try_is_modified(&self) -> Result<bool> {
        self.inner.modified.get()
    }

    /// The memoized comparison itself, for composing into other deriveds.
    pub fn modified(&self) -> Derived<Result<bool>> {
        self.inner.modified.clone()
    }

    /// Last failure of a source sync, cleared by the next successful one.
    pub fn sync_error(&self) -> Option<Error> {
        self.inner.sync_error.get()
    }

    pub fn config(&self) -> ResettableConfig {
        self.inner.config
    }

    pub fn is_watching(&self) -> bool {
        self.inner
            .watcher
            .as_ref()
            .is_some_and(|w| !w.is_stopped())
    }

    /// Stop following the watch source. The tracker itself keeps working.
    pub fn stop(&self) {
        if let Some(watcher) = &self.inner.watcher {
            if !watcher.is_stopped() {
                watcher.stop();
                tracing::debug!("resettable stopped watching its source");
            }
        }
    }
}

impl<T: PlainData + fmt::Debug> fmt::Debug for Resettable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resettable")
            .field("value", &self.inner.value.peek())
            .field("original", &self.inner.original.peek())
            .field("modified", &self.inner.modified.peek())
            .field("watching", &self.is_watching())
            .finish()
    }
}

fn sync_from_source<T: PlainData>(
    next: &T,
    value: &Signal<T>,
    original: &Original<T>,
    sync_error: &Signal<Option<Error>>,
    config: ResettableConfig,
) {
    // Both copies are made before anything is written
    let copies = clone_plain(next).and_then(|next_value| {
        let next_original = if config.sync_original_on_source_change {
            Some(clone_plain(&next_value)?)
        } else {
            None
        };
        Ok((next_value, next_original))
    });

    match copies {
        Ok((next_value, next_original)) => {
            let synced_original = next_original.is_some();
            batch(|| {
                value.set(next_value);
                if let Some(next_original) = next_original {
                    original.write(next_original);
                }
                sync_error.set(None);
            });
            tracing::debug!(synced_original, "resettable synced from source");
        }
        Err(err) => {
            tracing::warn!(error = %err, "watch source value could not be copied, tracker left unchanged");
            sync_error.set(Some(err));
        }
    }
}

/// Track `initial` as both value and original.
///
/// `initial` may be a plain value, an accessor, a signal or a derived; it is
/// read once, without subscribing, and copied twice.
///
/// # Errors
///
/// Fails when the initial value cannot be copied with
/// [`clone_plain`](crate::clone_plain).
pub fn use_resettable<T: PlainData>(
    initial: impl Into<MaybeSignal<T>>,
    options: ResettableOptions<T>,
) -> Result<Resettable<T>> {
    Resettable::new(initial, options)
}
