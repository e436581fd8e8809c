//! Error types for the ms-js-parser crate.
//!
//! This module provides the [`ParseError`] type for failures of the parsing
//! machinery itself. A source file that is not valid JavaScript is *not* a
//! [`ParseError`]: it is reported as a [`SyntaxFailure`](crate::SyntaxFailure)
//! inside a successful [`SourceScan`](crate::SourceScan).

/// Errors that can occur while setting up or running the parser.
///
/// # Examples
///
/// ```
/// use ms_js_parser::ParseError;
///
/// fn handle_error(err: ParseError) {
///     match err {
///         ParseError::LanguageInit(grammar) => eprintln!("Failed to load {grammar}"),
///         ParseError::QueryCompile { offset, .. } => {
///             eprintln!("Query compilation failed at offset {offset}");
///         }
///         ParseError::Parse => eprintln!("Parser produced no tree"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to set a grammar on a tree-sitter parser.
    #[error("failed to set {0} language")]
    LanguageInit(&'static str),

    /// Failed to compile a tree-sitter query.
    ///
    /// Contains the byte offset where the error occurred and the error kind.
    #[error("failed to compile query at offset {offset}: {kind:?}")]
    QueryCompile {
        /// The byte offset in the query string where the error occurred.
        offset: usize,
        /// The kind of query error.
        kind: tree_sitter::QueryError,
    },

    /// The parser returned no tree.
    ///
    /// This only happens when parsing is cancelled or times out.
    #[error("failed to parse source code")]
    Parse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_init_display() {
        let err = ParseError::LanguageInit("JavaScript");
        assert_eq!(err.to_string(), "failed to set JavaScript language");
    }

    #[test]
    fn test_parse_display() {
        let err = ParseError::Parse;
        assert_eq!(err.to_string(), "failed to parse source code");
    }
}
