// ============================================================================
// spark-resettable - Tracker Configuration
// ============================================================================

use serde::{Deserialize, Serialize};

/// The static knobs of a resettable tracker.
///
/// Unknown fields are rejected and missing ones take their defaults, so a
/// config file only needs to mention what it changes.
///
/// # Example
///
/// ```
/// use spark_resettable::ResettableConfig;
///
/// let config: ResettableConfig = serde_json::from_str(r#"{ "deep_watch": true }"#).unwrap();
/// assert!(config.deep_watch);
/// assert!(config.sync_original_on_source_change);
/// assert!(!config.freeze_original);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResettableConfig {
    /// A watch source change also becomes the new original.
    pub sync_original_on_source_change: bool,
    /// Observe nested mutation of the watch source, not only replacement.
    pub deep_watch: bool,
    /// Reject writes through [`Original`](crate::Original) handles.
    pub freeze_original: bool,
}

impl Default for ResettableConfig {
    fn default() -> Self {
        Self {
            sync_original_on_source_change: true,
            deep_watch: false,
            freeze_original: false,
        }
    }
}
