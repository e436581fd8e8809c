//! Module specifier classification.

use ms_core::{ClassifierConfig, FxHashSet, SpecifierKind};

/// Classifies import specifiers against a built-in module table.
///
/// Rules are applied in a fixed order and the first match wins:
///
/// | Order | Rule | Kind |
/// |-------|------|------|
/// | 1 | starts with `.` | [`Relative`](SpecifierKind::Relative) |
/// | 2 | exact built-in name | [`Builtin`](SpecifierKind::Builtin) |
/// | 3 | `/`, `\` or a drive prefix like `C:\` | [`Absolute`](SpecifierKind::Absolute) |
/// | 4 | anything else | [`Package`](SpecifierKind::Package) |
///
/// # Examples
///
/// ```
/// use ms_core::{ClassifierConfig, SpecifierKind};
/// use ms_js_parser::SpecifierClassifier;
///
/// let classifier = SpecifierClassifier::new(&ClassifierConfig::default());
/// assert_eq!(classifier.classify("./a"), SpecifierKind::Relative);
/// assert_eq!(classifier.classify("fs"), SpecifierKind::Builtin);
/// assert_eq!(classifier.classify("/abs/path"), SpecifierKind::Absolute);
/// assert_eq!(classifier.classify("left-pad"), SpecifierKind::Package);
/// ```
#[derive(Debug, Clone)]
pub struct SpecifierClassifier {
    builtins: FxHashSet<String>,
}

impl SpecifierClassifier {
    /// Builds a classifier from the configured built-in table.
    #[must_use]
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            builtins: config.builtin_modules.iter().cloned().collect(),
        }
    }

    /// Classifies one specifier.
    #[must_use]
    pub fn classify(&self, specifier: &str) -> SpecifierKind {
        if specifier.starts_with('.') {
            SpecifierKind::Relative
        } else if self.builtins.contains(specifier) {
            SpecifierKind::Builtin
        } else if is_absolute(specifier) {
            SpecifierKind::Absolute
        } else {
            SpecifierKind::Package
        }
    }
}

/// Returns `true` for rooted POSIX or Windows paths.
///
/// A drive prefix is a single word character followed by `:` and a slash.
#[must_use]
pub fn is_absolute(specifier: &str) -> bool {
    match specifier.as_bytes() {
        [b'/' | b'\\', ..] => true,
        [drive, b':', b'/' | b'\\', ..] => drive.is_ascii_alphanumeric() || *drive == b'_',
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SpecifierClassifier {
        SpecifierClassifier::new(&ClassifierConfig::default())
    }

    #[test]
    fn test_classification_table() {
        let classifier = classifier();
        let cases = [
            ("./a", SpecifierKind::Relative),
            ("../util/x", SpecifierKind::Relative),
            (".", SpecifierKind::Relative),
            ("fs", SpecifierKind::Builtin),
            ("child_process", SpecifierKind::Builtin),
            ("/abs/path", SpecifierKind::Absolute),
            ("\\\\share\\x", SpecifierKind::Absolute),
            ("C:\\x", SpecifierKind::Absolute),
            ("d:/x", SpecifierKind::Absolute),
            ("left-pad", SpecifierKind::Package),
            ("@scope/pkg", SpecifierKind::Package),
            ("fs/promises-ish", SpecifierKind::Package),
        ];
        for (specifier, expected) in cases {
            assert_eq!(classifier.classify(specifier), expected, "{specifier:?}");
        }
    }

    #[test]
    fn test_builtin_requires_exact_match() {
        let classifier = classifier();
        assert_eq!(classifier.classify("FS"), SpecifierKind::Package);
        assert_eq!(classifier.classify("fs "), SpecifierKind::Package);
    }

    #[test]
    fn test_configured_builtins() {
        let config = ClassifierConfig {
            builtin_modules: vec!["vendor-runtime".to_owned()],
            ..ClassifierConfig::default()
        };
        let classifier = SpecifierClassifier::new(&config);
        assert_eq!(classifier.classify("vendor-runtime"), SpecifierKind::Builtin);
        assert_eq!(classifier.classify("fs"), SpecifierKind::Package);
    }

    #[test]
    fn test_is_absolute_edge_cases() {
        assert!(!is_absolute("C:"));
        assert!(!is_absolute("CC:\\x"));
        assert!(!is_absolute("http://x"));
        assert!(is_absolute("_:/x"));
    }
}
