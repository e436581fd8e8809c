//! Pluggable package analysis.
//!
//! The engine knows nothing about what is measured. An [`Analyzer`] supplies
//! the record type and either a per-file hook, called for every walked file
//! with a shared per-package record, or a per-package hook that inspects the
//! extracted tree as a whole.
//!
//! [`ImportClassifier`] is the default analyzer: it counts `require`
//! specifiers by kind.

use std::future::Future;

use camino::Utf8Path;
use ms_core::{ClassifierConfig, ImportStats};
use ms_js_parser::{SourceScan, SourceScanner};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ScanError;

/// Which hook the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerMode {
    /// Call [`Analyzer::on_file`] once per walked file.
    Files,
    /// Call [`Analyzer::on_package`] once per extracted package.
    Package,
}

/// The package being analyzed.
#[derive(Debug, Clone, Copy)]
pub struct PackageContext<'a> {
    /// Registry name (without the index key prefix).
    pub name: &'a str,
    /// Folder the archive was extracted into.
    pub root: &'a Utf8Path,
}

impl PackageContext<'_> {
    /// Returns `path` relative to the extraction folder, for log lines.
    #[must_use]
    pub fn relative<'p>(&self, path: &'p Utf8Path) -> &'p Utf8Path {
        path.strip_prefix(self.root).unwrap_or(path)
    }
}

/// A per-package measurement driven by the scan engine.
///
/// Implementors supply the hook matching their [`mode`](Self::mode); the
/// other hook's default raises [`ScanError::HookNotSupplied`].
///
/// Errors for which [`ScanError::is_recoverable`] holds are contained by the
/// engine: a file-level error skips the file, a package-level rejection is
/// committed as an error record. Any other error stops the run.
pub trait Analyzer {
    /// The record committed to the index for each analyzed package.
    ///
    /// It is also restored from the in-flight checkpoint when a crawl resumes
    /// in the middle of a package.
    type Record: Serialize + DeserializeOwned + Default;

    /// Which hook the engine should drive.
    fn mode(&self) -> AnalyzerMode {
        AnalyzerMode::Files
    }

    /// Extension of the files passed to [`on_file`](Self::on_file), if only
    /// one kind is wanted. Compared case-insensitively.
    fn source_extension(&self) -> Option<&str> {
        None
    }

    /// Analyzes one file, updating the package's record.
    fn on_file(
        &mut self,
        _path: &Utf8Path,
        _record: &mut Self::Record,
        _package: &PackageContext<'_>,
    ) -> impl Future<Output = Result<(), ScanError>> {
        async { Err(ScanError::HookNotSupplied("on_file")) }
    }

    /// Analyzes a whole extracted package.
    fn on_package(
        &mut self,
        _package: &PackageContext<'_>,
    ) -> impl Future<Output = Result<Self::Record, ScanError>> {
        async { Err(ScanError::HookNotSupplied("on_package")) }
    }
}

/// Counts import specifiers in every source file of a package.
///
/// # Examples
///
/// ```no_run
/// use ms_core::ClassifierConfig;
/// use ms_scanner::{Analyzer, ImportClassifier};
///
/// let classifier = ImportClassifier::new(&ClassifierConfig::default())?;
/// assert_eq!(classifier.source_extension(), Some("js"));
/// # Ok::<(), ms_scanner::ScanError>(())
/// ```
#[derive(Debug)]
pub struct ImportClassifier {
    scanner: SourceScanner,
    extension: String,
}

impl ImportClassifier {
    /// Creates the classifier from its lookup tables.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Parse`] if the parser cannot be initialized.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ScanError> {
        Ok(Self {
            scanner: SourceScanner::new(config)?,
            extension: config.source_extension.clone(),
        })
    }
}

impl Analyzer for ImportClassifier {
    type Record = ImportStats;

    fn source_extension(&self) -> Option<&str> {
        Some(&self.extension)
    }

    async fn on_file(
        &mut self,
        path: &Utf8Path,
        record: &mut ImportStats,
        package: &PackageContext<'_>,
    ) -> Result<(), ScanError> {
        if is_root_main(path, package.root) {
            record.root_main = 1;
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ScanError::read(path, e))?;
        let text = String::from_utf8_lossy(&bytes);

        record.files += 1;
        debug!(path = %package.relative(path), "Scanning module");

        match self.scanner.scan(&text)? {
            SourceScan::Parsed(report) => {
                for call in &report.calls {
                    record.record(call.kind);
                }
                record.size += report.size;
                if report.has_imports() {
                    record.files_with_imports += 1;
                    record.import_size += report.size;
                }
            }
            SourceScan::Rejected { failure, probe } => {
                record.parse_errors += 1;
                warn!(
                    path = %package.relative(path),
                    line = failure.location.line,
                    column = failure.location.column,
                    error = %failure.message,
                    fallback = %probe,
                    "Error parsing module"
                );
            }
        }

        Ok(())
    }
}

/// Returns `true` for a `main.js` directly in the extraction folder or in its
/// `package/` subfolder.
fn is_root_main(path: &Utf8Path, root: &Utf8Path) -> bool {
    if path.file_name() != Some("main.js") {
        return false;
    }
    path.parent()
        .is_some_and(|dir| dir == root || dir == root.join("package"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use ms_core::SpecifierKind;
    use tempfile::TempDir;

    struct Nothing;

    impl Analyzer for Nothing {
        type Record = ImportStats;
    }

    fn package_dir(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        for (file, content) in files {
            let path = root.join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("mkdir");
            }
            std::fs::write(&path, content).expect("write");
        }
        (dir, root)
    }

    async fn classify(files: &[(&str, &str)]) -> ImportStats {
        let (_dir, root) = package_dir(files);
        let mut classifier = ImportClassifier::new(&ClassifierConfig::default()).expect("classifier");
        let package = PackageContext {
            name: "fixture",
            root: &root,
        };
        let mut record = ImportStats::default();
        for (file, _) in files {
            classifier
                .on_file(&root.join(file), &mut record, &package)
                .await
                .expect("on_file");
        }
        record
    }

    #[tokio::test]
    async fn test_missing_hooks_raise() {
        let root = Utf8PathBuf::from(".");
        let package = PackageContext {
            name: "x",
            root: &root,
        };
        let mut analyzer = Nothing;
        let mut record = ImportStats::default();

        let err = analyzer
            .on_file(Utf8Path::new("a.js"), &mut record, &package)
            .await
            .expect_err("no hook");
        assert!(matches!(err, ScanError::HookNotSupplied("on_file")));

        let err = analyzer.on_package(&package).await.expect_err("no hook");
        assert!(matches!(err, ScanError::HookNotSupplied("on_package")));
        assert_eq!(analyzer.mode(), AnalyzerMode::Files);
    }

    #[tokio::test]
    async fn test_counts_per_kind() {
        let record = classify(&[
            ("package/index.js", "var a = require('./a');\nvar fs = require('fs');\nrequire('left-pad');"),
            ("package/a.js", "module.exports = require('/abs/path');"),
            ("package/none.js", "module.exports = 1;"),
        ])
        .await;

        assert_eq!(record.files, 3);
        assert_eq!(record.count(SpecifierKind::Relative), 1);
        assert_eq!(record.count(SpecifierKind::Builtin), 1);
        assert_eq!(record.count(SpecifierKind::Package), 1);
        assert_eq!(record.count(SpecifierKind::Absolute), 1);
        assert_eq!(record.files_with_imports, 2);
        assert_eq!(record.parse_errors, 0);
        assert!(record.size > record.import_size);
        assert_eq!(record.root_main, 0);
    }

    #[tokio::test]
    async fn test_parse_error_counted_and_skipped() {
        let record = classify(&[
            ("package/bad.js", "var = require('x');"),
            ("package/good.js", "require('fs');"),
        ])
        .await;

        assert_eq!(record.files, 2);
        assert_eq!(record.parse_errors, 1);
        assert_eq!(record.builtin, 1);
        assert_eq!(record.package, 0);
        assert_eq!(record.size, 14);
    }

    #[tokio::test]
    async fn test_root_main_detected() {
        let record = classify(&[("package/main.js", "")]).await;
        assert_eq!(record.root_main, 1);

        let record = classify(&[("main.js", "")]).await;
        assert_eq!(record.root_main, 1);

        let record = classify(&[("package/lib/main.js", "")]).await;
        assert_eq!(record.root_main, 0);
    }

    #[test]
    fn test_relative_path_for_logs() {
        let root = Utf8PathBuf::from("_work/package");
        let package = PackageContext {
            name: "x",
            root: &root,
        };
        assert_eq!(
            package.relative(Utf8Path::new("_work/package/package/a.js")).as_str(),
            "package/a.js"
        );
        assert_eq!(
            package.relative(Utf8Path::new("elsewhere.js")).as_str(),
            "elsewhere.js"
        );
    }
}
