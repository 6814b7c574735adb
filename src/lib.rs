// ============================================================================
// spark-resettable - Resettable Reactive State for Rust
// ============================================================================
//
// A tracker that keeps a live value next to an original snapshot, flags when
// they differ, and can reset, redefine or replace either side. It rides on a
// small synchronous signals runtime (signals, deriveds, effects, scopes and
// watchers) that lives in this crate.
// ============================================================================

#[macro_use]
mod macros;

pub mod config;
pub mod core;
pub mod error;
pub mod primitives;
pub mod reactivity;
pub mod snapshot;

pub use crate::config::ResettableConfig;
pub use crate::core::constants;
pub use crate::core::context::{is_batching, is_tracking, is_untracking, with_context, ReactiveContext};
pub use crate::core::types::{default_equals, AnyReaction, AnySource, EqualsFn, SourceInner};
pub use crate::error::{Error, Result};

pub use crate::primitives::derived::{derived, derived_with_equals, Derived};
pub use crate::primitives::effect::{effect, effect_tracking, effect_with_cleanup, CleanupFn, Effect};
pub use crate::primitives::maybe::MaybeSignal;
pub use crate::primitives::resettable::{use_resettable, Original, Resettable, ResettableOptions};
pub use crate::primitives::scope::{
    effect_scope, get_current_scope, on_scope_dispose, EffectScope, ScopeCleanupFn,
};
pub use crate::primitives::signal::{signal, signal_with_equals, Signal};
pub use crate::primitives::watch::{watch, WatchHandle, WatchOptions};

pub use crate::reactivity::batching::{batch, peek, untrack};
pub use crate::reactivity::equality::{equals, never_equals, structural_eq, try_structural_eq};
pub use crate::reactivity::scheduling::flush_sync;

pub use crate::snapshot::{clone_plain, snapshot, to_raw, PlainData};
