//! Source positions for parse diagnostics.

use serde::{Deserialize, Serialize};

/// A position within a source file.
///
/// - `line` is 1-indexed (first line is line 1)
/// - `column` is 0-indexed, counted in bytes within the line
///
/// # Examples
///
/// ```
/// use ms_core::SourceLocation;
///
/// let loc = SourceLocation::new(10, 5);
/// assert_eq!(loc.to_string(), "10:5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed).
    pub line: u32,

    /// Column number (0-indexed).
    pub column: u32,
}

impl SourceLocation {
    /// Creates a new source location.
    #[inline]
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_new() {
        let loc = SourceLocation::new(10, 5);
        assert_eq!(loc.line, 10);
        assert_eq!(loc.column, 5);
    }

    #[test]
    fn test_source_location_display() {
        assert_eq!(SourceLocation::new(3, 0).to_string(), "3:0");
        assert_eq!(SourceLocation::default().to_string(), "0:0");
    }
}
