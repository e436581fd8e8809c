//! Import call extraction from parsed JavaScript using tree-sitter queries.
//!
//! This module finds every call whose callee is a bare identifier equal to
//! the import function name and whose first argument is a string literal,
//! and decodes the literal to its runtime value.

use ms_core::SourceLocation;
use smallvec::SmallVec;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use crate::parser::WrappedTree;
use crate::queries::{CAPTURE_CALLEE, CAPTURE_SPECIFIER};

/// One import call found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCallSite {
    /// The decoded string literal passed as the first argument.
    pub specifier: String,
    /// Position of the literal in the original file text.
    pub location: SourceLocation,
}

/// Extracts import calls from a wrapped tree, in document order.
///
/// Calls through a member (`obj.require('x')`), calls with a non-literal
/// first argument (`require(name)`), calls whose literal is empty
/// (`require('')`), and calls to other functions are not matched.
///
/// # Examples
///
/// ```
/// use ms_js_parser::{JsParser, extract_import_calls, import_call_query};
///
/// let mut parser = JsParser::new()?;
/// if let Ok(wrapped) = parser.parse_wrapped("var fs = require('fs'); obj.require('x');")? {
///     let calls = extract_import_calls(&wrapped, import_call_query()?, "require");
///     assert_eq!(calls.len(), 1);
///     assert_eq!(calls[0].specifier, "fs");
/// }
/// # Ok::<(), ms_js_parser::ParseError>(())
/// ```
pub fn extract_import_calls(
    wrapped: &WrappedTree,
    query: &Query,
    import_function: &str,
) -> SmallVec<[ImportCallSite; 8]> {
    let source_bytes = wrapped.source.as_bytes();
    let root = wrapped.tree.root_node();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source_bytes);
    let mut calls = SmallVec::new();

    while let Some(match_) = matches.next() {
        let mut callee = None;
        let mut specifier = None;
        for capture in match_.captures {
            match capture.index {
                CAPTURE_CALLEE => callee = Some(capture.node),
                CAPTURE_SPECIFIER => specifier = Some(capture.node),
                _ => {}
            }
        }

        let (Some(callee), Some(specifier)) = (callee, specifier) else {
            continue;
        };
        if node_text(callee, &wrapped.source) != Some(import_function) {
            continue;
        }
        let Some(literal) = node_text(specifier, &wrapped.source) else {
            continue;
        };

        let value = decode_string_literal(literal);
        if value.is_empty() {
            continue;
        }

        let position = specifier.start_position();
        calls.push(ImportCallSite {
            specifier: value,
            location: SourceLocation::new(
                u32::try_from(position.row).unwrap_or(u32::MAX),
                u32::try_from(position.column).unwrap_or(u32::MAX),
            ),
        });
    }

    calls
}

/// Decodes a quoted JavaScript string literal to its value.
///
/// Handles single-character escapes, legacy octal escapes, `\x`, `\u`,
/// `\u{...}` (combining surrogate pairs) and line continuations. Unpaired
/// surrogates decode to U+FFFD.
///
/// # Examples
///
/// ```
/// use ms_js_parser::decode_string_literal;
///
/// assert_eq!(decode_string_literal("'./lib'"), "./lib");
/// assert_eq!(decode_string_literal(r#""\x66s""#), "fs");
/// assert_eq!(decode_string_literal(r"'C:\\x'"), r"C:\x");
/// ```
#[must_use]
pub fn decode_string_literal(literal: &str) -> String {
    let body = strip_quotes(literal);
    if !body.contains('\\') {
        return body.to_owned();
    }

    let mut units: Vec<u16> = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut units, c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => units.push(0x0A),
            'r' => units.push(0x0D),
            't' => units.push(0x09),
            'b' => units.push(0x08),
            'f' => units.push(0x0C),
            'v' => units.push(0x0B),
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                // Up to three digits, never exceeding 0o377.
                let max_digits = if escaped <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                units.push(u16::try_from(value).unwrap_or(0xFFFD));
            }
            'x' => match take_hex(&mut chars, 2) {
                Some(value) => units.push(u16::try_from(value).unwrap_or(0xFFFD)),
                None => push_char(&mut units, 'x'),
            },
            'u' => {
                let value = if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut value: u32 = 0;
                    for d in chars.by_ref() {
                        if d == '}' {
                            break;
                        }
                        value = value.saturating_mul(16).saturating_add(d.to_digit(16).unwrap_or(0));
                    }
                    value
                } else {
                    take_hex(&mut chars, 4).unwrap_or(u32::from('u'))
                };
                match u16::try_from(value) {
                    Ok(unit) => units.push(unit),
                    Err(_) => push_char(&mut units, char::from_u32(value).unwrap_or('\u{FFFD}')),
                }
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => push_char(&mut units, other),
        }
    }

    String::from_utf16_lossy(&units)
}

fn strip_quotes(literal: &str) -> &str {
    let mut chars = literal.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('"' | '\'')), Some(close)) if open == close => chars.as_str(),
        _ => literal,
    }
}

fn push_char(units: &mut Vec<u16>, c: char) {
    let mut buf = [0u16; 2];
    units.extend_from_slice(c.encode_utf16(&mut buf));
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, count: usize) -> Option<u32> {
    let mut lookahead = chars.clone();
    let mut value = 0;
    for _ in 0..count {
        value = value * 16 + lookahead.next()?.to_digit(16)?;
    }
    *chars = lookahead;
    Some(value)
}

/// Extracts the text content of a node from the source.
#[inline]
fn node_text<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    source.get(node.start_byte()..node.end_byte())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsParser, import_call_query};

    fn calls(text: &str) -> Vec<String> {
        let mut parser = JsParser::new().expect("parser");
        let wrapped = parser
            .parse_wrapped(text)
            .expect("parse")
            .expect("no syntax failure");
        let query = import_call_query().expect("query");
        extract_import_calls(&wrapped, query, "require")
            .into_iter()
            .map(|call| call.specifier)
            .collect()
    }

    #[test]
    fn test_extract_in_document_order() {
        let text = "var a = require('./a');\nvar fs = require(\"fs\");\nrequire('left-pad');";
        assert_eq!(calls(text), vec!["./a", "fs", "left-pad"]);
    }

    #[test]
    fn test_non_literal_argument_ignored() {
        assert!(calls("var name = 'x'; require(name);").is_empty());
        assert!(calls("require('a' + b);").is_empty());
        assert!(calls("require();").is_empty());
    }

    #[test]
    fn test_member_call_ignored() {
        assert!(calls("obj.require('x');").is_empty());
        assert!(calls("requireX('x'); myrequire('y');").is_empty());
    }

    #[test]
    fn test_only_first_argument_counts() {
        assert_eq!(calls("require('a', 'b');"), vec!["a"]);
        assert!(calls("require(x, 'b');").is_empty());
    }

    #[test]
    fn test_nested_calls_found() {
        let text = "module.exports = function () { return require('inner'); };";
        assert_eq!(calls(text), vec!["inner"]);
    }

    #[test]
    fn test_location_maps_to_file_line() {
        let mut parser = JsParser::new().expect("parser");
        let wrapped = parser
            .parse_wrapped("\n\n  require('x');")
            .expect("parse")
            .expect("no syntax failure");
        let query = import_call_query().expect("query");
        let found = extract_import_calls(&wrapped, query, "require");
        assert_eq!(found[0].location, SourceLocation::new(3, 10));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_string_literal(r"'a\nb'"), "a\nb");
        assert_eq!(decode_string_literal(r"'\u0066s'"), "fs");
        assert_eq!(decode_string_literal(r"'\u{1F600}'"), "\u{1F600}");
        assert_eq!(decode_string_literal(r"'\uD83D\uDE00'"), "\u{1F600}");
        assert_eq!(decode_string_literal(r"'\101'"), "A");
        assert_eq!(decode_string_literal("'a\\\nb'"), "ab");
        assert_eq!(decode_string_literal(r"'\.\/x'"), "./x");
    }

    #[test]
    fn test_decode_unpaired_surrogate() {
        assert_eq!(decode_string_literal(r"'\uD83D'"), "\u{FFFD}");
    }
}
