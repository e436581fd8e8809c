//! Pre-compiled tree-sitter query for import call extraction.
//!
//! This module provides the [`IMPORT_CALL_QUERY`] constant and
//! [`import_call_query`] for lazily compiling and caching it.

use std::sync::OnceLock;

use tree_sitter::{Language, Query};

use crate::error::ParseError;

/// Tree-sitter query matching calls whose callee is a bare identifier and
/// whose first argument is a string literal.
///
/// The callee name is not fixed in the query; it is compared against the
/// configured import function name by the extractor, so the same compiled
/// query serves any name.
///
/// # Capture Names
///
/// - `call.callee` - The bare identifier being called
/// - `call.specifier` - The first argument, a string literal
pub const IMPORT_CALL_QUERY: &str = r"
(call_expression
  function: (identifier) @call.callee
  arguments: (arguments
    .
    (string) @call.specifier))
";

/// Capture index for `call.callee`.
pub const CAPTURE_CALLEE: u32 = 0;

/// Capture index for `call.specifier`.
pub const CAPTURE_SPECIFIER: u32 = 1;

static COMPILED_QUERY: OnceLock<Query> = OnceLock::new();

/// Returns the compiled import call query for JavaScript.
///
/// The query is compiled once and cached for all subsequent calls.
///
/// # Errors
///
/// Returns [`ParseError::QueryCompile`] if the query fails to compile.
pub fn import_call_query() -> Result<&'static Query, ParseError> {
    if let Some(query) = COMPILED_QUERY.get() {
        return Ok(query);
    }

    let language: Language = tree_sitter_javascript::LANGUAGE.into();
    let query = compile_query(&language)?;

    Ok(COMPILED_QUERY.get_or_init(|| query))
}

fn compile_query(language: &Language) -> Result<Query, ParseError> {
    Query::new(language, IMPORT_CALL_QUERY).map_err(|e| ParseError::QueryCompile {
        offset: e.offset,
        kind: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_compiles() {
        let result = import_call_query();
        assert!(result.is_ok(), "Query should compile: {result:?}");
    }

    #[test]
    fn test_capture_indices() {
        let query = import_call_query().expect("Query should compile");
        let names = query.capture_names();
        assert_eq!(names[CAPTURE_CALLEE as usize], "call.callee");
        assert_eq!(names[CAPTURE_SPECIFIER as usize], "call.specifier");
        assert_eq!(query.pattern_count(), 1);
    }
}
