//! Syntax failure detection on tree-sitter trees.
//!
//! tree-sitter never refuses input; it recovers by inserting `ERROR` and
//! `MISSING` nodes. A file is considered unparseable when its wrapped tree
//! contains any such node, and the first one in document order is reported.

use ms_core::SourceLocation;
use tree_sitter::{Node, Tree};

use crate::text::WRAP_PREFIX;

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "^=", "|=", "&&=",
    "||=", "??=",
];

/// The category of a syntax failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxFailureKind {
    /// An assignment whose target is a call expression, such as `f() = 1`.
    ///
    /// Older dialects accepted this; current ones reject it. Such files are
    /// skipped without running the fallback probe.
    InvalidAssignmentTarget,

    /// Any other syntax error.
    Other,
}

/// The first syntax error found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFailure {
    /// What went wrong.
    pub kind: SyntaxFailureKind,
    /// Position in the original file text.
    pub location: SourceLocation,
    /// Human-readable description.
    pub message: String,
}

impl SyntaxFailure {
    /// Returns `true` if this failure is skipped without a fallback probe.
    #[inline]
    #[must_use]
    pub const fn is_invalid_assignment(&self) -> bool {
        matches!(self.kind, SyntaxFailureKind::InvalidAssignmentTarget)
    }
}

impl std::fmt::Display for SyntaxFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.location)
    }
}

/// Finds the first error or missing node in a tree parsed from wrapped text.
///
/// `wrapped` is the text the tree was parsed from and `original` the file
/// text inside it; positions are mapped back to `original`.
pub(crate) fn first_failure(tree: &Tree, wrapped: &str, original: &str) -> Option<SyntaxFailure> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let node = find_first_error(root)?;
    let location = map_location(node, original);

    let (kind, message) = if is_call_assignment(node, wrapped) {
        (
            SyntaxFailureKind::InvalidAssignmentTarget,
            "Invalid left-hand side in assignment".to_owned(),
        )
    } else if node.is_missing() {
        (SyntaxFailureKind::Other, format!("Missing {}", node.kind()))
    } else {
        let snippet = wrapped
            .get(node.start_byte()..node.end_byte())
            .and_then(|text| text.split_whitespace().next())
            .unwrap_or_default();
        let message = if snippet.is_empty() {
            "Unexpected end of input".to_owned()
        } else {
            format!("Unexpected token {snippet}")
        };
        (SyntaxFailureKind::Other, message)
    };

    Some(SyntaxFailure {
        kind,
        location,
        message,
    })
}

/// Pre-order search, descending only into subtrees that contain errors.
fn find_first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    let mut node = root;
    loop {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let next = node
            .children(&mut cursor)
            .find(|child| child.is_error() || child.is_missing() || child.has_error());
        node = next?;
    }
}

fn map_location(node: Node<'_>, original: &str) -> SourceLocation {
    // The prefix contributes exactly one line, so wrapped row n is file line n.
    debug_assert!(WRAP_PREFIX.ends_with('\n'));
    let last_line = original.bytes().filter(|&b| b == b'\n').count() + 1;
    let point = node.start_position();

    let (line, column) = match point.row {
        0 => (1, 0),
        row if row > last_line => (last_line, 0),
        row => (row, point.column),
    };
    SourceLocation::new(
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}

/// Recognizes an assignment operator applied directly to a call result.
///
/// Looks inside the error node and among its siblings, since recovery may
/// place the operator on either side of the error boundary.
fn is_call_assignment(error: Node<'_>, wrapped: &str) -> bool {
    if has_call_before_operator(error) || is_split_call_assignment(error, wrapped) {
        return true;
    }
    if let (Some(prev), Some(first)) = (error.prev_sibling(), error.child(0)) {
        if is_assignment_operator(first) && ends_in_call(prev) {
            return true;
        }
    }
    error.parent().is_some_and(has_call_before_operator)
}

/// Recognizes an assignment operator following a call in the text around the
/// error, as in `f() += 1`, where the lexer only accepts `+` as a binary
/// operator after a call and the error starts at the trailing `=`.
fn is_split_call_assignment(error: Node<'_>, wrapped: &str) -> bool {
    let start = error.start_byte();
    let (Some(before), Some(after)) = (wrapped.get(..start), wrapped.get(start..)) else {
        return false;
    };
    let lead = after.len() - after.trim_start_matches(is_operator_char).len();
    let rest = &after[lead..];
    if !rest.starts_with('=') || rest.starts_with("==") {
        return false;
    }

    let head = before.trim_end_matches(is_operator_char);
    let operator = format!("{}{}=", &before[head.len()..], &after[..lead]);
    if !ASSIGNMENT_OPERATORS.contains(&operator.as_str()) {
        return false;
    }

    let target = head.trim_end();
    if !target.ends_with(')') {
        return false;
    }
    let end = target.len();

    let mut root = error;
    while let Some(parent) = root.parent() {
        root = parent;
    }
    let mut node = root.descendant_for_byte_range(end - 1, end);
    while let Some(current) = node.filter(|n| n.end_byte() == end) {
        if current.kind() == "call_expression" {
            return true;
        }
        node = current.parent();
    }
    false
}

const fn is_operator_char(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '%' | '<' | '>' | '&' | '^' | '|' | '?')
}

fn has_call_before_operator(container: Node<'_>) -> bool {
    let mut cursor = container.walk();
    let children: Vec<Node<'_>> = container.children(&mut cursor).collect();
    children
        .windows(2)
        .any(|pair| ends_in_call(pair[0]) && starts_with_operator(pair[1]))
}

fn ends_in_call(node: Node<'_>) -> bool {
    match node.kind() {
        "call_expression" | "arguments" => true,
        "ERROR" => node
            .child(node.child_count().saturating_sub(1))
            .is_some_and(ends_in_call),
        _ => false,
    }
}

fn starts_with_operator(node: Node<'_>) -> bool {
    if is_assignment_operator(node) {
        return true;
    }
    node.is_error() && node.child(0).is_some_and(is_assignment_operator)
}

fn is_assignment_operator(node: Node<'_>) -> bool {
    !node.is_named() && ASSIGNMENT_OPERATORS.contains(&node.kind())
}
