//! Source text preparation: shebang stripping, function wrapping, and the
//! whitespace-collapsed size proxy.

/// Opening of the synthetic function every file is parsed inside.
///
/// Ends with a newline so that line `n` of the file is row `n` of the
/// wrapped text.
pub const WRAP_PREFIX: &str = "function m() { \n";

/// Closing of the synthetic function.
pub const WRAP_SUFFIX: &str = "\n }";

/// Removes a leading `#!` interpreter line, keeping its line terminator.
///
/// Only a shebang on the very first line is removed.
///
/// # Examples
///
/// ```
/// use ms_js_parser::strip_shebang;
///
/// assert_eq!(strip_shebang("#!/usr/bin/env node\nrequire('x');"), "\nrequire('x');");
/// assert_eq!(strip_shebang("var a = 1;"), "var a = 1;");
/// ```
#[must_use]
pub fn strip_shebang(text: &str) -> &str {
    if !text.starts_with("#!") {
        return text;
    }
    match text.find(is_line_terminator) {
        Some(end) => &text[end..],
        None => "",
    }
}

/// Wraps file text in the synthetic function body.
///
/// Many published files are not valid standalone programs (a stray top-level
/// `return`, legacy sloppy-mode syntax) but are valid function bodies.
#[must_use]
pub fn wrap_function_body(text: &str) -> String {
    let mut wrapped = String::with_capacity(WRAP_PREFIX.len() + text.len() + WRAP_SUFFIX.len());
    wrapped.push_str(WRAP_PREFIX);
    wrapped.push_str(text);
    wrapped.push_str(WRAP_SUFFIX);
    wrapped
}

/// Counts characters after collapsing formatting whitespace.
///
/// Leading spaces, tabs and carriage returns of every line are dropped, as
/// are spaces and tabs directly before a line break. Line breaks themselves
/// and interior whitespace are kept, so the count is stable across
/// indentation styles but still reflects the code's length.
///
/// # Examples
///
/// ```
/// use ms_js_parser::size_proxy;
///
/// assert_eq!(size_proxy("if (a) {\n    b();  \n}"), size_proxy("if (a) {\nb();\n}"));
/// assert_eq!(size_proxy("a b"), 3);
/// ```
#[must_use]
pub fn size_proxy(text: &str) -> u64 {
    let mut count: u64 = 0;
    let mut at_line_start = true;
    let mut pending_blanks: u64 = 0;

    for c in text.chars() {
        if at_line_start && matches!(c, ' ' | '\t' | '\r') {
            continue;
        }
        at_line_start = false;

        match c {
            ' ' | '\t' => pending_blanks += 1,
            '\r' | '\n' => {
                pending_blanks = 0;
                count += 1;
                at_line_start = c == '\n';
            }
            _ => {
                count += pending_blanks + 1;
                pending_blanks = 0;
            }
        }
    }

    count + pending_blanks
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_shebang_only_first_line() {
        assert_eq!(strip_shebang("#!/bin/node"), "");
        assert_eq!(strip_shebang("#!/bin/node\r\nx"), "\r\nx");
        assert_eq!(strip_shebang("x\n#!/bin/node"), "x\n#!/bin/node");
    }

    #[test]
    fn test_wrap_function_body() {
        assert_eq!(wrap_function_body("return 42;"), "function m() { \nreturn 42;\n }");
    }

    #[test]
    fn test_size_proxy_leading_whitespace() {
        assert_eq!(size_proxy("    a"), 1);
        assert_eq!(size_proxy("a\n\t\tb"), 3);
        assert_eq!(size_proxy("\r\n  a"), 2);
    }

    #[test]
    fn test_size_proxy_trailing_whitespace() {
        assert_eq!(size_proxy("a  \nb"), 3);
        assert_eq!(size_proxy("a \r\nb"), 4);
        // No line break follows, so trailing blanks are kept.
        assert_eq!(size_proxy("a  "), 3);
    }

    #[test]
    fn test_size_proxy_interior_whitespace() {
        assert_eq!(size_proxy("var  a = 1;"), 11);
        assert_eq!(size_proxy(""), 0);
    }

    #[test]
    fn test_size_proxy_indentation_independent() {
        let tabs = "function f() {\n\treturn 1;\n}\n";
        let spaces = "function f() {\n        return 1;    \n}\n";
        assert_eq!(size_proxy(tabs), size_proxy(spaces));
    }
}
