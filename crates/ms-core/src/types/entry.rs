//! Persisted index entries and index key encoding.
//!
//! Every package name in the index maps to exactly one [`IndexEntry`]. On disk
//! the entry is `null` (pending), `{"error": "..."}` (skipped with a reason),
//! or an analyzer-defined record object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix given to purely numeric package names inside the index.
const NUMERIC_KEY_PREFIX: char = '.';

/// Returns the index key for a registry package name.
///
/// Purely numeric names get a non-numeric prefix so that map iteration order
/// survives a JSON round-trip through runtimes that hoist integer keys.
/// Registry names never start with a dot, so the prefix is unambiguous.
///
/// # Examples
///
/// ```
/// use ms_core::{display_name, index_key};
///
/// assert_eq!(index_key("1337"), ".1337");
/// assert_eq!(index_key("left-pad"), "left-pad");
/// assert_eq!(display_name(".1337"), "1337");
/// ```
#[must_use]
pub fn index_key(name: &str) -> String {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
        format!("{NUMERIC_KEY_PREFIX}{name}")
    } else {
        name.to_owned()
    }
}

/// Returns the registry package name for an index key.
#[must_use]
pub fn display_name(key: &str) -> &str {
    key.strip_prefix(NUMERIC_KEY_PREFIX).unwrap_or(key)
}

/// The state of one package in the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum IndexEntry {
    /// Not processed yet.
    #[default]
    Pending,

    /// Skipped with a reason, e.g. `"Archive does not exist"`.
    Failed {
        /// Why the package could not be analyzed.
        error: String,
    },

    /// Analyzed; the record is analyzer-defined.
    Done(serde_json::Value),
}

impl IndexEntry {
    /// Creates a [`Failed`](Self::Failed) entry.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Creates a [`Done`](Self::Done) entry from a serializable record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be represented as JSON.
    pub fn done<T: Serialize>(record: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(record).map(Self::Done)
    }

    /// Creates the empty record used for operator-skipped packages.
    #[must_use]
    pub fn skipped() -> Self {
        Self::Done(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Returns `true` if the package has not been processed.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the stored record, if the package was analyzed.
    #[must_use]
    pub const fn record(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Done(record) => Some(record),
            Self::Pending | Self::Failed { .. } => None,
        }
    }

    /// Decodes the stored record into an analyzer's record type.
    #[must_use]
    pub fn record_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.record()
            .and_then(|record| serde_json::from_value(record.clone()).ok())
    }

    /// Returns the failure reason, if the package was skipped with an error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Pending | Self::Done(_) => None,
        }
    }

    fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Pending => serde_json::Value::Null,
            Self::Failed { error } => serde_json::json!({ "error": error }),
            Self::Done(record) => record.clone(),
        }
    }

    fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Pending,
            serde_json::Value::Object(map) if is_error_object(&map) => {
                let error = map
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                Self::Failed { error }
            }
            other => Self::Done(other),
        }
    }
}

/// An error record is an object whose only field is a string `error`.
fn is_error_object(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.len() == 1 && map.get("error").is_some_and(serde_json::Value::is_string)
}

impl Serialize for IndexEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending => serializer.serialize_unit(),
            Self::Done(record) => record.serialize(serializer),
            Self::Failed { .. } => self.to_value().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for IndexEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImportStats;
    use serde_json::json;

    #[test]
    fn test_index_key_numeric() {
        assert_eq!(index_key("0"), ".0");
        assert_eq!(index_key("42"), ".42");
        assert_eq!(index_key("42a"), "42a");
        assert_eq!(index_key("@scope/pkg"), "@scope/pkg");
        assert_eq!(index_key(""), "");
    }

    #[test]
    fn test_display_name_round_trip() {
        for name in ["7", "1234", "left-pad", "@types/node"] {
            assert_eq!(display_name(&index_key(name)), name);
        }
    }

    #[test]
    fn test_entry_json_shapes() {
        assert_eq!(serde_json::to_value(IndexEntry::Pending).unwrap(), json!(null));
        assert_eq!(
            serde_json::to_value(IndexEntry::failed("Archive does not exist")).unwrap(),
            json!({"error": "Archive does not exist"})
        );
        assert_eq!(serde_json::to_value(IndexEntry::skipped()).unwrap(), json!({}));
    }

    #[test]
    fn test_entry_decoding() {
        let pending: IndexEntry = serde_json::from_value(json!(null)).unwrap();
        assert!(pending.is_pending());

        let failed: IndexEntry =
            serde_json::from_value(json!({"error": "Package metadata does not exist"})).unwrap();
        assert_eq!(failed.error(), Some("Package metadata does not exist"));

        let done: IndexEntry = serde_json::from_value(json!({"modules": 2})).unwrap();
        assert_eq!(done.record_as::<ImportStats>().map(|s| s.files), Some(2));
        assert!(done.error().is_none());
    }

    #[test]
    fn test_record_with_error_field_and_more_is_a_record() {
        let entry: IndexEntry =
            serde_json::from_value(json!({"error": "x", "modules": 1})).unwrap();
        assert!(entry.record().is_some());
    }
}
