// ============================================================================
// spark-resettable - Equality Functions
// ============================================================================
//
// Besides the usual PartialEq based checks this module holds the structural
// comparison used by the resettable tracker: both sides are serialized into
// serde_json values and those are compared. Two values are equal exactly when
// they serialize the same, which means fields skipped by serde do not count
// and map key order does not matter.
// ============================================================================

use serde::Serialize;

use crate::error::{Error, Result};

/// `PartialEq` equality. Default for `signal()`.
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Always false: every write counts as a change.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Compare two values by their serialized form.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if either side cannot be serialized.
///
/// # Example
///
/// ```
/// use spark_resettable::try_structural_eq;
/// use std::collections::HashMap;
///
/// let a: HashMap<&str, i32> = [("x", 1), ("y", 2)].into();
/// let b: HashMap<&str, i32> = [("y", 2), ("x", 1)].into();
/// assert_eq!(try_structural_eq(&a, &b), Ok(true));
/// ```
pub fn try_structural_eq<T: Serialize + ?Sized>(a: &T, b: &T) -> Result<bool> {
    let a = serde_json::to_value(a).map_err(|e| Error::Serialize(e.to_string()))?;
    let b = serde_json::to_value(b).map_err(|e| Error::Serialize(e.to_string()))?;
    Ok(a == b)
}

/// Like [`try_structural_eq`] but a serialization failure reads as "not
/// equal". Fits `EqualsFn<T>`, so a signal using it always accepts writes it
/// cannot compare.
pub fn structural_eq<T: Serialize>(a: &T, b: &T) -> bool {
    try_structural_eq(a, b).unwrap_or(false)
}
