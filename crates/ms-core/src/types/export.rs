//! The export-shape record.

use serde::{Deserialize, Serialize};

/// What a package's main module exports at runtime.
///
/// A package "overwrites" its exports when the loaded value is not a plain
/// object, e.g. `module.exports = function () {}`. Function exports that also
/// carry properties are recorded with those property names as `expando`.
///
/// # Examples
///
/// ```
/// use ms_core::ExportShape;
///
/// let shape = ExportShape::from_probe("function", false, vec!["sync".to_owned()]);
/// assert!(shape.overwrite);
/// assert!(shape.is_expanded_function());
///
/// let plain = ExportShape::from_probe("object", true, vec!["a".to_owned()]);
/// assert!(!plain.overwrite);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportShape {
    /// The export is something other than a plain object.
    pub overwrite: bool,

    /// `typeof` of the export when overwritten, empty otherwise.
    #[serde(rename = "overwriteType")]
    pub overwrite_type: String,

    /// Own enumerable keys of an overwritten export.
    pub expando: Vec<String>,
}

impl ExportShape {
    /// Builds the record from what the probe observed.
    ///
    /// Plain objects (type `object` whose prototype is `Object.prototype`)
    /// produce the default, non-overwritten record.
    #[must_use]
    pub fn from_probe(type_of: &str, object_proto: bool, keys: Vec<String>) -> Self {
        if type_of == "object" && object_proto {
            return Self::default();
        }
        Self {
            overwrite: true,
            overwrite_type: type_of.to_owned(),
            expando: keys,
        }
    }

    /// Reads a committed index record, if it is an export-shape record.
    #[must_use]
    pub fn from_record(record: &serde_json::Value) -> Option<Self> {
        if !record.get("overwrite").is_some_and(serde_json::Value::is_boolean) {
            return None;
        }
        serde_json::from_value(record.clone()).ok()
    }

    /// Returns `true` for an overwritten function export with extra properties.
    #[must_use]
    pub fn is_expanded_function(&self) -> bool {
        self.is_function() && !self.expando.is_empty()
    }

    /// Returns `true` for an overwritten function export.
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.overwrite && self.overwrite_type == "function"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_probe_plain_object() {
        let shape = ExportShape::from_probe("object", true, vec!["x".to_owned()]);
        assert_eq!(shape, ExportShape::default());
    }

    #[test]
    fn test_from_probe_class_instance() {
        let shape = ExportShape::from_probe("object", false, Vec::new());
        assert!(shape.overwrite);
        assert_eq!(shape.overwrite_type, "object");
        assert!(!shape.is_function());
    }

    #[test]
    fn test_from_record() {
        let record = json!({"overwrite": true, "overwriteType": "function", "expando": ["sync"]});
        let shape = ExportShape::from_record(&record).unwrap();
        assert!(shape.is_expanded_function());

        assert!(ExportShape::from_record(&json!({})).is_none());
        assert!(ExportShape::from_record(&json!({"modules": 1})).is_none());
    }
}
