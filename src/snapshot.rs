// ============================================================================
// spark-resettable - Snapshots
// Detached deep copies of plain data
// ============================================================================
//
// A snapshot is taken by serializing into a serde_json::Value and reading the
// value type back out of it. The copy shares nothing with its input, not even
// through Rc, and only values that survive the trip are accepted. Reactive
// handles implement neither Serialize nor Deserialize, so they can never end
// up inside a snapshot.
// ============================================================================

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::primitives::maybe::MaybeSignal;

/// Values that can be snapshotted.
pub trait PlainData: Clone + Serialize + DeserializeOwned + 'static {}

impl<T> PlainData for T where T: Clone + Serialize + DeserializeOwned + 'static {}

/// Deep copy `value` through its serialized form.
///
/// # Errors
///
/// [`Error::Serialize`] when the value cannot be serialized, for example a
/// map keyed by tuples. [`Error::Deserialize`] when the serialized form does
/// not read back as `T`, for example a non-finite float.
///
/// # Example
///
/// ```
/// use spark_resettable::clone_plain;
/// use std::rc::Rc;
///
/// let shared = Rc::new(vec![1, 2]);
/// let copy = clone_plain(&shared).unwrap();
/// assert_eq!(copy, shared);
/// assert!(!Rc::ptr_eq(&copy, &shared));
/// ```
pub fn clone_plain<T: PlainData>(value: &T) -> Result<T> {
    let plain = serde_json::to_value(value).map_err(|e| Error::Serialize(e.to_string()))?;
    serde_json::from_value(plain).map_err(|e| Error::Deserialize(e.to_string()))
}

/// Current plain value behind `source`, read without subscribing.
pub fn to_raw<T: Clone + 'static>(source: &MaybeSignal<T>) -> T {
    source.to_value()
}

/// [`to_raw`] followed by [`clone_plain`].
pub fn snapshot<T: PlainData>(source: &MaybeSignal<T>) -> Result<T> {
    clone_plain(&to_raw(source))
}
