// ============================================================================
// spark-resettable - Errors
// ============================================================================

/// Failures surfaced by snapshotting, comparison and frozen originals.
///
/// Messages from `serde_json` are kept as strings so the error stays `Clone`
/// and can be cached inside deriveds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The value could not be turned into plain data.
    #[error("value cannot be serialized into plain data: {0}")]
    Serialize(String),

    /// Plain data could not be turned back into the value type.
    #[error("plain data cannot be restored into the value type: {0}")]
    Deserialize(String),

    /// An in-place write was attempted on a frozen original.
    #[error("the original value is frozen")]
    Frozen,
}

pub type Result<T> = std::result::Result<T, Error>;
