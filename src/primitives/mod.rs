// ============================================================================
// spark-resettable - Primitives Module
// Signals, deriveds, effects, scopes, watchers and the resettable tracker
// ============================================================================

pub mod derived;
pub mod effect;
pub mod maybe;
pub mod resettable;
pub mod scope;
pub mod signal;
pub mod watch;

pub use derived::{derived, derived_with_equals, update_derived_chain, Derived, DerivedInner};
pub use effect::{
    destroy_effect, effect, effect_tracking, effect_with_cleanup, update_effect, CleanupFn,
    Effect, EffectInner,
};
pub use maybe::MaybeSignal;
pub use resettable::{use_resettable, Original, Resettable, ResettableOptions};
pub use scope::{effect_scope, get_current_scope, on_scope_dispose, EffectScope, ScopeCleanupFn};
pub use signal::{signal, signal_with_equals, Signal};
pub use watch::{watch, WatchHandle, WatchOptions};
