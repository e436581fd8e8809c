//! Read-only summaries over the persisted index.
//!
//! Every report is a pure function of a [`PackageIndex`]: it never mutates
//! the index and can be produced at any time, including mid-crawl. Division
//! by zero yields `0` rather than `NaN`, so an empty index prints cleanly.
//!
//! # Examples
//!
//! ```
//! use ms_core::{ImportStats, IndexEntry, ReportConfig};
//! use ms_scanner::{ModuleSpecReport, PackageIndex};
//!
//! let mut index = PackageIndex::from_names("data.json", ["a", "b"]);
//! let stats = ImportStats { files: 1, relative: 1, package: 3, ..ImportStats::default() };
//! index.commit("a", IndexEntry::done(&stats)?);
//!
//! let report = ModuleSpecReport::from_index(&index, &ReportConfig::default());
//! assert_eq!(report.packages, 1);
//! assert!((report.non_relative_percent() - 75.0).abs() < 1e-9);
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::fmt;

use ms_core::{
    ExportShape, FxHashMap, ImportStats, ReportConfig, SpecifierKind, display_name, fx_hash_map,
};

use crate::index::PackageIndex;

/// `numerator / denominator * 100`, or 0 when the denominator is 0.
#[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
fn percent(numerator: u64, denominator: u64) -> f64 {
    ratio(numerator, denominator) * 100.0
}

/// `numerator / denominator`, or 0 when the denominator is 0.
#[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Aggregate of every import statistics record in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSpecReport {
    /// Names in the index, pending or not.
    pub total_names: u64,
    /// Packages with an import statistics record.
    pub packages: u64,
    /// Packages shipping a root `main.js`.
    pub root_main: u64,
    /// Sum of every record.
    pub totals: ImportStats,
    /// Weights used for the rewrite-cost estimate.
    pub weights: ReportConfig,
}

impl ModuleSpecReport {
    /// Sums every import statistics record in the index.
    ///
    /// Pending entries, error entries, and operator-skipped `{}` entries only
    /// count towards [`total_names`](Self::total_names).
    #[must_use]
    pub fn from_index(index: &PackageIndex, weights: &ReportConfig) -> Self {
        let mut report = Self {
            total_names: index.len() as u64,
            weights: *weights,
            ..Self::default()
        };

        for (_, entry) in index.iter() {
            let Some(stats) = entry.record().and_then(ImportStats::from_record) else {
                continue;
            };
            report.packages += 1;
            report.root_main += stats.root_main.min(1);
            report.totals += &stats;
        }

        report
    }

    /// Share of the index that has been scanned.
    #[must_use]
    pub fn scanned_percent(&self) -> f64 {
        percent(self.packages, self.total_names)
    }

    /// Share of all import calls falling in `kind`.
    #[must_use]
    pub fn share(&self, kind: SpecifierKind) -> f64 {
        percent(self.totals.count(kind), self.totals.total_imports())
    }

    /// Share of import calls resolved by name (built-in or package).
    #[must_use]
    pub fn non_relative_percent(&self) -> f64 {
        percent(self.totals.non_relative(), self.totals.total_imports())
    }

    /// Share of scanned files that failed to parse.
    #[must_use]
    pub fn parse_error_percent(&self) -> f64 {
        percent(self.totals.parse_errors, self.totals.files)
    }

    /// Share of scanned files containing at least one import.
    #[must_use]
    pub fn files_with_imports_percent(&self) -> f64 {
        percent(self.totals.files_with_imports, self.totals.files)
    }

    /// Average size proxy over all scanned files.
    #[must_use]
    pub fn average_file_size(&self) -> f64 {
        ratio(self.totals.size, self.totals.files)
    }

    /// Average size proxy over files that contain imports.
    #[must_use]
    pub fn average_import_file_size(&self) -> f64 {
        ratio(self.totals.import_size, self.totals.files_with_imports)
    }

    /// Characters added if every specifier were rewritten to its explicit
    /// form (scheme-prefixed built-ins, extension-suffixed relative paths).
    #[must_use]
    pub const fn rewrite_cost(&self) -> u64 {
        self.totals.builtin * self.weights.builtin_rewrite_cost
            + self.totals.package * self.weights.package_rewrite_cost
            + self.totals.relative * self.weights.relative_rewrite_cost
    }

    /// Rewrite cost per file with imports.
    #[must_use]
    pub fn rewrite_cost_per_file(&self) -> f64 {
        ratio(self.rewrite_cost(), self.totals.files_with_imports)
    }

    /// Rewrite cost relative to the size of files with imports.
    #[must_use]
    pub fn rewrite_cost_percent(&self) -> f64 {
        percent(self.rewrite_cost(), self.totals.import_size)
    }

    /// Share of scanned packages shipping a root `main.js`.
    #[must_use]
    pub fn root_main_percent(&self) -> f64 {
        percent(self.root_main, self.packages)
    }
}

impl fmt::Display for ModuleSpecReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.totals;
        writeln!(f, "=== Module Specifier Analysis ===")?;
        writeln!(f)?;
        writeln!(f, "Packages Scanned: {} ({:.2}%)", self.packages, self.scanned_percent())?;
        writeln!(f, "Files Scanned: {}", t.files)?;
        writeln!(
            f,
            "Modules with Imports: {} ({:.2}%)",
            t.files_with_imports,
            self.files_with_imports_percent()
        )?;
        writeln!(f, "Parse Errors: {} ({:.2}%)", t.parse_errors, self.parse_error_percent())?;
        for kind in SpecifierKind::ALL {
            writeln!(f, "{kind}: {} ({:.2}%)", t.count(kind), self.share(kind))?;
        }
        writeln!(f, "Non-Relative: {} ({:.2}%)", t.non_relative(), self.non_relative_percent())?;
        writeln!(f)?;
        writeln!(f, "Average File Size: {:.2}", self.average_file_size())?;
        writeln!(f, "Average Module Size: {:.2}", self.average_import_file_size())?;
        writeln!(f, "Keystroke Increase per Module: {:.2}", self.rewrite_cost_per_file())?;
        writeln!(
            f,
            "Keystroke Increase: {} ({:.2}%)",
            self.rewrite_cost(),
            self.rewrite_cost_percent()
        )?;
        writeln!(f)?;
        write!(
            f,
            "Packages with main.js at root: {} ({:.1}%)",
            self.root_main,
            self.root_main_percent()
        )
    }
}

/// Aggregate of every export-shape record in the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportShapeReport {
    /// Names in the index, pending or not.
    pub total_names: u64,
    /// Packages with an export-shape record.
    pub packages: u64,
    /// Packages whose export is not a plain object.
    pub overwrite: u64,
    /// Overwritten exports that are functions.
    pub function_overwrite: u64,
    /// Function exports carrying extra properties.
    pub expanded: u64,
}

impl ExportShapeReport {
    /// Counts every export-shape record in the index.
    #[must_use]
    pub fn from_index(index: &PackageIndex) -> Self {
        let mut report = Self {
            total_names: index.len() as u64,
            ..Self::default()
        };

        for (_, entry) in index.iter() {
            let Some(shape) = entry.record().and_then(ExportShape::from_record) else {
                continue;
            };
            report.packages += 1;
            if shape.overwrite {
                report.overwrite += 1;
            }
            if shape.is_function() {
                report.function_overwrite += 1;
            }
            if shape.is_expanded_function() {
                report.expanded += 1;
            }
        }

        report
    }
}

impl fmt::Display for ExportShapeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = self.overwrite - self.expanded;
        writeln!(f, "=== Module Overwrite Analysis ===")?;
        writeln!(f)?;
        writeln!(
            f,
            "Packages Scanned: {} ({:.1}%)",
            self.packages,
            percent(self.packages, self.total_names)
        )?;
        writeln!(
            f,
            "Custom Exports: {} ({:.1}%)",
            self.overwrite,
            percent(self.overwrite, self.packages)
        )?;
        writeln!(
            f,
            "Function Exports: {} ({:.1}%) ({:.1}%)",
            self.function_overwrite,
            percent(self.function_overwrite, self.packages),
            percent(self.function_overwrite, self.overwrite)
        )?;
        writeln!(
            f,
            "Function Exports with Expandos: {} ({:.1}%) ({:.1}%)",
            self.expanded,
            percent(self.expanded, self.function_overwrite),
            percent(self.expanded, self.packages)
        )?;
        write!(
            f,
            "Custom Exports without Expandos: {} ({:.1}%)",
            plain,
            percent(plain, self.packages)
        )
    }
}

/// How often each character appears across all package names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCharacterReport {
    /// Characters and counts, most frequent first.
    pub counts: Vec<(char, u64)>,
}

impl NameCharacterReport {
    /// Counts characters of every registry name in the index.
    ///
    /// Ties are broken by character so the output is stable.
    #[must_use]
    pub fn from_index(index: &PackageIndex) -> Self {
        let mut counts: FxHashMap<char, u64> = fx_hash_map();
        for (key, _) in index.iter() {
            for c in display_name(key).chars() {
                *counts.entry(c).or_default() += 1;
            }
        }

        let mut counts: Vec<(char, u64)> = counts.into_iter().collect();
        counts.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Self { counts }
    }
}

impl fmt::Display for NameCharacterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "== Characters Used in Package Names ==")?;
        if !self.counts.is_empty() {
            writeln!(f)?;
        }
        for (c, count) in &self.counts {
            write!(f, "\n{c}: {count}")?;
        }
        Ok(())
    }
}
