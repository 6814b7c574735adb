// ============================================================================
// spark-resettable - Reactivity Module
// Read tracking, write propagation, scheduling and equality
// ============================================================================

pub mod batching;
pub mod equality;
pub mod scheduling;
pub mod tracking;

pub use batching::{batch, peek, untrack};
pub use equality::{equals, never_equals, structural_eq, try_structural_eq};
pub use scheduling::{flush_sync, schedule_effect};
pub use tracking::{
    install_dependencies, is_dirty, mark_reactions, notify_write, remove_reactions, track_read,
};
