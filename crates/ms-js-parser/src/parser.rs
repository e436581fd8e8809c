//! JavaScript parser management using tree-sitter.
//!
//! This module provides [`JsParser`], which parses file text inside the
//! synthetic function body and reports the first syntax failure, if any.

use tree_sitter::{Language, Parser, Tree};

use crate::error::ParseError;
use crate::syntax::{SyntaxFailure, first_failure};
use crate::text::wrap_function_body;

/// The wrapped source text together with its syntax tree.
///
/// Nodes of [`tree`](Self::tree) index into [`source`](Self::source), not
/// into the original file text.
#[derive(Debug)]
pub struct WrappedTree {
    /// The file text inside the synthetic function.
    pub source: String,
    /// The syntax tree of [`source`](Self::source).
    pub tree: Tree,
}

/// JavaScript parser for source files scanned out of a package.
///
/// Wraps a tree-sitter parser configured for JavaScript. Reuse one parser
/// for all files of a crawl to avoid repeated initialization.
///
/// `JsParser` is `Send` but not `Sync`.
///
/// # Examples
///
/// ```
/// use ms_js_parser::JsParser;
///
/// let mut parser = JsParser::new()?;
/// // A top-level return is fine inside the synthetic function.
/// assert!(parser.parse_wrapped("return 42;")?.is_ok());
/// # Ok::<(), ms_js_parser::ParseError>(())
/// ```
pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    /// Creates a new JavaScript parser.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar cannot be loaded.
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_javascript::LANGUAGE.into();

        parser
            .set_language(&language)
            .map_err(|_| ParseError::LanguageInit("JavaScript"))?;

        Ok(Self { parser })
    }

    /// Parses `text` inside the synthetic function body.
    ///
    /// The outer `Result` carries machinery failures. The inner one is the
    /// verdict on the text itself: a tree with no error nodes, or the first
    /// [`SyntaxFailure`] with its position mapped back to the file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Parse`] if tree-sitter produced no tree.
    pub fn parse_wrapped(
        &mut self,
        text: &str,
    ) -> Result<Result<WrappedTree, SyntaxFailure>, ParseError> {
        let source = wrap_function_body(text);
        let tree = self.parser.parse(&source, None).ok_or(ParseError::Parse)?;

        if let Some(failure) = first_failure(&tree, &source, text) {
            return Ok(Err(failure));
        }
        Ok(Ok(WrappedTree { source, tree }))
    }

    /// Parses `text` as a standalone program.
    ///
    /// Returns `true` if the tree contains no error nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Parse`] if tree-sitter produced no tree.
    pub fn accepts_program(&mut self, text: &str) -> Result<bool, ParseError> {
        let tree = self.parser.parse(text, None).ok_or(ParseError::Parse)?;
        Ok(!tree.root_node().has_error())
    }
}

impl std::fmt::Debug for JsParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsParser").finish_non_exhaustive()
    }
}
