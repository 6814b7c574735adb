// ============================================================================
// spark-resettable - Constants
// Flag bits carried by every node of the reactive graph
// ============================================================================

// =============================================================================
// NODE KIND
// =============================================================================

/// Plain writable cell (signal)
pub const SOURCE: u32 = 1 << 0;

/// Memoized computed cell
pub const DERIVED: u32 = 1 << 1;

/// Side-effecting reaction (effects and watchers)
pub const EFFECT: u32 = 1 << 2;

// =============================================================================
// STATUS
// =============================================================================

/// Up to date
pub const CLEAN: u32 = 1 << 10;

/// A direct dependency changed, must rerun
pub const DIRTY: u32 = 1 << 11;

/// An upstream derived may have changed, check before rerunning
pub const MAYBE_DIRTY: u32 = 1 << 12;

/// Reaction is running and collecting dependencies
pub const REACTION_IS_UPDATING: u32 = 1 << 13;

/// Reaction has been torn down and must never run again
pub const DESTROYED: u32 = 1 << 14;

/// Reaction is paused by its scope
pub const INERT: u32 = 1 << 15;

/// Clears CLEAN, DIRTY and MAYBE_DIRTY while keeping every other bit
pub const STATUS_MASK: u32 = !(DIRTY | MAYBE_DIRTY | CLEAN);
