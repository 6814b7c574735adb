// ============================================================================
// spark-resettable - Core Module
// Flags, node traits and the thread-local context of the reactive graph
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

pub use constants::*;
pub use context::{is_batching, is_tracking, is_untracking, with_context, ReactiveContext};
pub use types::{default_equals, AnyReaction, AnySource, DepList, EqualsFn, ReactionList, SourceInner};
