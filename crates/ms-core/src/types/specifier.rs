//! Specifier categories.

use serde::{Deserialize, Serialize};

/// The category of a module specifier passed to an import call.
///
/// Classification is done in a fixed precedence order: relative, then
/// built-in, then absolute, with third-party package as the fallback.
///
/// # Examples
///
/// ```
/// use ms_core::SpecifierKind;
///
/// assert!(SpecifierKind::Package.is_non_relative());
/// assert!(!SpecifierKind::Relative.is_non_relative());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecifierKind {
    /// Begins with a dot: `./lib`, `../util`.
    Relative,

    /// Exact match against the runtime built-in table: `fs`, `path`.
    Builtin,

    /// Rooted path: `/abs/path`, `\\share`, `C:\\x`.
    Absolute,

    /// Anything else, resolved from installed dependencies: `left-pad`.
    Package,
}

impl SpecifierKind {
    /// All categories, in classification precedence order.
    pub const ALL: [Self; 4] = [Self::Relative, Self::Builtin, Self::Absolute, Self::Package];

    /// Returns `true` for specifiers resolved by name rather than by path.
    ///
    /// Only built-in and package specifiers count; absolute paths are
    /// neither relative nor name-resolved.
    #[inline]
    #[must_use]
    pub const fn is_non_relative(self) -> bool {
        matches!(self, Self::Builtin | Self::Package)
    }

    /// Returns a human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Relative => "Relative",
            Self::Builtin => "System",
            Self::Absolute => "Absolute",
            Self::Package => "Package",
        }
    }
}

impl std::fmt::Display for SpecifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_non_relative() {
        assert!(SpecifierKind::Builtin.is_non_relative());
        assert!(SpecifierKind::Package.is_non_relative());
        assert!(!SpecifierKind::Relative.is_non_relative());
        assert!(!SpecifierKind::Absolute.is_non_relative());
    }

    #[test]
    fn test_precedence_order() {
        assert_eq!(SpecifierKind::ALL[0], SpecifierKind::Relative);
        assert_eq!(SpecifierKind::ALL[3], SpecifierKind::Package);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&SpecifierKind::Builtin).unwrap(),
            r#""builtin""#
        );
    }
}
