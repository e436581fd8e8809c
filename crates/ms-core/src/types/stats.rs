//! The per-package import statistics record.
//!
//! [`ImportStats`] is what the default import classifier commits for each
//! scanned package. Its JSON field names are the ones used by existing
//! `data.json` files, so an index written by an earlier crawl can be resumed
//! and reported on without migration.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use super::specifier::SpecifierKind;

/// Aggregate import counts for one package.
///
/// Created once per package, filled while its files are analyzed, and never
/// mutated after it is committed to the index.
///
/// # Examples
///
/// ```
/// use ms_core::{ImportStats, SpecifierKind};
///
/// let mut stats = ImportStats::default();
/// stats.record(SpecifierKind::Relative);
/// stats.record(SpecifierKind::Package);
/// stats.record(SpecifierKind::Package);
///
/// assert_eq!(stats.total_imports(), 3);
/// assert_eq!(stats.non_relative(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportStats {
    /// Source files scanned (including ones that failed to parse).
    #[serde(rename = "modules")]
    pub files: u64,

    /// Source files that could not be parsed.
    #[serde(rename = "parseErrors")]
    pub parse_errors: u64,

    /// Built-in module specifiers.
    #[serde(rename = "platform")]
    pub builtin: u64,

    /// Third-party package specifiers.
    pub package: u64,

    /// Relative specifiers.
    pub relative: u64,

    /// Absolute path specifiers.
    pub absolute: u64,

    /// 1 if the package ships a `main.js` at its root.
    #[serde(rename = "rootMain")]
    pub root_main: u64,

    /// Whitespace-collapsed character count over all parsed files.
    #[serde(rename = "keystrokes")]
    pub size: u64,

    /// Whitespace-collapsed character count over files with imports.
    #[serde(rename = "moduleKeystrokes")]
    pub import_size: u64,

    /// Parsed files containing at least one import call.
    #[serde(rename = "modulesWithImports")]
    pub files_with_imports: u64,
}

impl ImportStats {
    /// Reads a committed index record, if it is an import statistics record.
    ///
    /// Records without a numeric `modules` field (skipped packages, error
    /// records, records of other analyzers) are not statistics.
    #[must_use]
    pub fn from_record(record: &serde_json::Value) -> Option<Self> {
        if !record.get("modules").is_some_and(serde_json::Value::is_number) {
            return None;
        }
        serde_json::from_value(record.clone()).ok()
    }

    /// Counts one specifier of the given kind.
    #[inline]
    pub fn record(&mut self, kind: SpecifierKind) {
        *self.count_mut(kind) += 1;
    }

    /// Returns the number of specifiers of the given kind.
    #[inline]
    #[must_use]
    pub const fn count(&self, kind: SpecifierKind) -> u64 {
        match kind {
            SpecifierKind::Relative => self.relative,
            SpecifierKind::Builtin => self.builtin,
            SpecifierKind::Absolute => self.absolute,
            SpecifierKind::Package => self.package,
        }
    }

    fn count_mut(&mut self, kind: SpecifierKind) -> &mut u64 {
        match kind {
            SpecifierKind::Relative => &mut self.relative,
            SpecifierKind::Builtin => &mut self.builtin,
            SpecifierKind::Absolute => &mut self.absolute,
            SpecifierKind::Package => &mut self.package,
        }
    }

    /// Total import calls across all four categories.
    #[inline]
    #[must_use]
    pub const fn total_imports(&self) -> u64 {
        self.relative + self.builtin + self.absolute + self.package
    }

    /// Built-in plus package specifiers.
    #[inline]
    #[must_use]
    pub const fn non_relative(&self) -> u64 {
        self.builtin + self.package
    }
}

impl AddAssign<&Self> for ImportStats {
    fn add_assign(&mut self, rhs: &Self) {
        self.files += rhs.files;
        self.parse_errors += rhs.parse_errors;
        self.builtin += rhs.builtin;
        self.package += rhs.package;
        self.relative += rhs.relative;
        self.absolute += rhs.absolute;
        self.root_main += rhs.root_main;
        self.size += rhs.size;
        self.import_size += rhs.import_size;
        self.files_with_imports += rhs.files_with_imports;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_each_kind() {
        let mut stats = ImportStats::default();
        for kind in SpecifierKind::ALL {
            stats.record(kind);
        }
        stats.record(SpecifierKind::Builtin);

        assert_eq!(stats.relative, 1);
        assert_eq!(stats.builtin, 2);
        assert_eq!(stats.absolute, 1);
        assert_eq!(stats.package, 1);
        assert_eq!(stats.count(SpecifierKind::Builtin), 2);
        assert_eq!(stats.total_imports(), 5);
        assert_eq!(stats.non_relative(), 3);
    }

    #[test]
    fn test_add_assign() {
        let one = ImportStats {
            files: 2,
            relative: 3,
            builtin: 2,
            package: 5,
            ..ImportStats::default()
        };
        let mut sum = ImportStats::default();
        sum += &one;
        sum += &one;
        assert_eq!(sum.files, 4);
        assert_eq!(sum.relative, 6);
        assert_eq!(sum.builtin, 4);
        assert_eq!(sum.package, 10);
        assert_eq!(sum.absolute, 0);
    }

    #[test]
    fn test_json_field_names() {
        let stats = ImportStats {
            files: 1,
            builtin: 2,
            size: 40,
            ..ImportStats::default()
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["modules"], 1);
        assert_eq!(value["platform"], 2);
        assert_eq!(value["keystrokes"], 40);
        assert_eq!(value["modulesWithImports"], 0);
    }

    #[test]
    fn test_from_record() {
        let record = json!({"modules": 3, "relative": 1, "parseErrors": 1});
        let stats = ImportStats::from_record(&record).unwrap();
        assert_eq!(stats.files, 3);
        assert_eq!(stats.relative, 1);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.package, 0);
    }

    #[test]
    fn test_from_record_rejects_other_records() {
        assert!(ImportStats::from_record(&json!({})).is_none());
        assert!(ImportStats::from_record(&json!({"error": "Archive does not exist"})).is_none());
        assert!(ImportStats::from_record(&json!({"overwrite": false})).is_none());
    }
}
