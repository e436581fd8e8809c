//! Per-file scanning: the full tolerant parse and classify pipeline.

use ms_core::{ClassifierConfig, SourceLocation, SpecifierKind};
use smallvec::SmallVec;
use tree_sitter::Query;

use crate::classify::SpecifierClassifier;
use crate::error::ParseError;
use crate::import::extract_import_calls;
use crate::parser::JsParser;
use crate::probe::{FallbackProbe, ProbeVerdict};
use crate::queries::import_call_query;
use crate::syntax::SyntaxFailure;
use crate::text::{size_proxy, strip_shebang};

/// A classified import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCall {
    /// The decoded specifier.
    pub specifier: String,
    /// Its category.
    pub kind: SpecifierKind,
    /// Position of the specifier literal in the file.
    pub location: SourceLocation,
}

/// Findings for a file that parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    /// Import calls, in document order.
    pub calls: SmallVec<[ImportCall; 8]>,
    /// Whitespace-collapsed character count of the file.
    pub size: u64,
}

impl SourceReport {
    /// Returns `true` if the file contains at least one import call.
    #[inline]
    #[must_use]
    pub fn has_imports(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// Outcome of scanning one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceScan {
    /// The file parsed and was analyzed.
    Parsed(SourceReport),
    /// The file did not parse and must be skipped.
    Rejected {
        /// The first syntax error.
        failure: SyntaxFailure,
        /// Verdict of the fallback probe.
        probe: ProbeVerdict,
    },
}

impl SourceScan {
    /// Returns the report of a parsed file.
    #[must_use]
    pub fn into_report(self) -> Option<SourceReport> {
        match self {
            Self::Parsed(report) => Some(report),
            Self::Rejected { .. } => None,
        }
    }

    /// Returns the syntax failure of a rejected file.
    #[must_use]
    pub const fn failure(&self) -> Option<&SyntaxFailure> {
        match self {
            Self::Parsed(_) => None,
            Self::Rejected { failure, .. } => Some(failure),
        }
    }
}

/// Scans source files for import calls.
///
/// Each file goes through the same steps: strip a leading shebang, parse
/// inside a synthetic function body, and on success collect and classify
/// every bare call to the import function with a string literal argument.
/// A file that fails to parse is never an error; it is reported as
/// [`SourceScan::Rejected`].
///
/// # Examples
///
/// ```
/// use ms_core::{ClassifierConfig, SpecifierKind};
/// use ms_js_parser::{SourceScan, SourceScanner};
///
/// let mut scanner = SourceScanner::new(&ClassifierConfig::default())?;
/// let report = scanner.scan("#!/usr/bin/env node\nrequire('fs');")?.into_report();
/// let report = report.expect("parses");
/// assert_eq!(report.calls[0].kind, SpecifierKind::Builtin);
/// # Ok::<(), ms_js_parser::ParseError>(())
/// ```
pub struct SourceScanner {
    parser: JsParser,
    probe: FallbackProbe,
    query: &'static Query,
    classifier: SpecifierClassifier,
    import_function: String,
}

impl SourceScanner {
    /// Creates a scanner from the classifier configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a grammar or the query cannot be loaded.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ParseError> {
        Ok(Self {
            parser: JsParser::new()?,
            probe: FallbackProbe::new()?,
            query: import_call_query()?,
            classifier: SpecifierClassifier::new(config),
            import_function: config.import_function.clone(),
        })
    }

    /// Scans one file's text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] only if the parser machinery fails.
    pub fn scan(&mut self, text: &str) -> Result<SourceScan, ParseError> {
        let text = strip_shebang(text);

        let wrapped = match self.parser.parse_wrapped(text)? {
            Ok(wrapped) => wrapped,
            Err(failure) => {
                let probe = if failure.is_invalid_assignment() {
                    ProbeVerdict::NotAttempted
                } else {
                    self.probe.probe(&mut self.parser, text)?
                };
                return Ok(SourceScan::Rejected { failure, probe });
            }
        };

        let calls = extract_import_calls(&wrapped, self.query, &self.import_function)
            .into_iter()
            .map(|site| ImportCall {
                kind: self.classifier.classify(&site.specifier),
                specifier: site.specifier,
                location: site.location,
            })
            .collect();

        Ok(SourceScan::Parsed(SourceReport {
            calls,
            size: size_proxy(text),
        }))
    }
}

impl std::fmt::Debug for SourceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceScanner")
            .field("import_function", &self.import_function)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> SourceScanner {
        SourceScanner::new(&ClassifierConfig::default()).expect("scanner")
    }

    fn parsed(text: &str) -> SourceReport {
        scanner()
            .scan(text)
            .expect("scan")
            .into_report()
            .expect("file should parse")
    }

    fn kinds(report: &SourceReport) -> Vec<SpecifierKind> {
        report.calls.iter().map(|call| call.kind).collect()
    }

    #[test]
    fn test_classifies_each_kind() {
        let text = "require('./a');\nrequire('fs');\nrequire('/abs/path');\nrequire('C:\\\\x');\nrequire('left-pad');";
        let report = parsed(text);
        assert_eq!(
            kinds(&report),
            vec![
                SpecifierKind::Relative,
                SpecifierKind::Builtin,
                SpecifierKind::Absolute,
                SpecifierKind::Absolute,
                SpecifierKind::Package,
            ]
        );
        assert_eq!(report.calls[3].specifier, "C:\\x");
    }

    #[test]
    fn test_variable_argument_not_counted() {
        let report = parsed("var x = 'fs'; require(x); obj.require('y');");
        assert!(!report.has_imports());
    }

    #[test]
    fn test_top_level_return_is_scanned() {
        let report = parsed("return 42;");
        assert!(!report.has_imports());
        assert_eq!(report.size, 10);
    }

    #[test]
    fn test_shebang_stripped() {
        let report = parsed("#!/usr/bin/env node\nvar a = require('a');");
        assert_eq!(report.calls.len(), 1);
        assert_eq!(report.calls[0].location.line, 2);
    }

    #[test]
    fn test_call_assignment_rejected() {
        for text in ["f() = 1;", "foo(bar) += 2;"] {
            let result = scanner().scan(text).expect("scan");
            assert!(matches!(result, SourceScan::Rejected { .. }), "{text}");
            assert!(
                result.failure().expect("failure").is_invalid_assignment(),
                "{text}"
            );
        }
    }

    #[test]
    fn test_empty_specifier_not_counted() {
        let report = parsed("require(''); require(\"\"); require('fs');");
        assert_eq!(kinds(&report), vec![SpecifierKind::Builtin]);

        let report = parsed("require('');");
        assert!(!report.has_imports());
    }

    #[test]
    fn test_other_failure_is_probed() {
        let result = scanner().scan("const a: number = require('x');").expect("scan");
        assert!(matches!(
            result,
            SourceScan::Rejected {
                probe: ProbeVerdict::AcceptedAsTypeScript,
                ..
            }
        ));
        assert!(!result.failure().expect("failure").is_invalid_assignment());
    }

    #[test]
    fn test_custom_import_function() {
        let config = ClassifierConfig {
            import_function: "load".to_owned(),
            ..ClassifierConfig::default()
        };
        let mut scanner = SourceScanner::new(&config).expect("scanner");
        let report = scanner
            .scan("load('fs'); require('x');")
            .expect("scan")
            .into_report()
            .expect("file should parse");
        assert_eq!(kinds(&report), vec![SpecifierKind::Builtin]);
    }
}
