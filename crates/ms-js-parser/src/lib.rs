//! Tolerant JavaScript parsing and import specifier classification.
//!
//! This crate scans the source files of published packages for calls to the
//! module import function and classifies each string specifier:
//!
//! - Parses every file inside a synthetic function body, so legacy scripts
//!   with a top-level `return` still parse
//! - Reports the first syntax failure instead of erroring, and runs a
//!   fallback probe to record which more permissive grammar would accept it
//! - Extracts bare calls like `require('x')` with tree-sitter queries
//! - Classifies specifiers as relative, built-in, absolute or package
//! - Measures a whitespace-collapsed size for each parsed file
//!
//! # Overview
//!
//! The main entry point is [`SourceScanner`]:
//!
//! ```
//! use ms_core::{ClassifierConfig, SpecifierKind};
//! use ms_js_parser::{SourceScan, SourceScanner};
//!
//! let mut scanner = SourceScanner::new(&ClassifierConfig::default())?;
//! let source = "var path = require('path');\nvar lib = require('./lib');";
//!
//! if let SourceScan::Parsed(report) = scanner.scan(source)? {
//!     for call in &report.calls {
//!         println!("{} -> {}", call.specifier, call.kind);
//!     }
//! }
//! # Ok::<(), ms_js_parser::ParseError>(())
//! ```
//!
//! # Specifier Classification
//!
//! | Specifier | Kind |
//! |-----------|------|
//! | `./lib`, `../x` | `Relative` |
//! | `fs`, `path` | `Builtin` |
//! | `/abs/path`, `C:\x` | `Absolute` |
//! | `left-pad`, `@scope/pkg` | `Package` |
//!
//! # Thread Safety
//!
//! The compiled query is shared through a `OnceLock`. Parsers are `Send`
//! but not `Sync`; create one [`SourceScanner`] per worker.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod classify;
pub mod error;
pub mod import;
pub mod parser;
pub mod probe;
pub mod queries;
pub mod scan;
pub mod syntax;
pub mod text;

pub use classify::{SpecifierClassifier, is_absolute};
pub use error::ParseError;
pub use import::{ImportCallSite, decode_string_literal, extract_import_calls};
pub use parser::{JsParser, WrappedTree};
pub use probe::{FallbackProbe, ProbeVerdict};
pub use queries::import_call_query;
pub use scan::{ImportCall, SourceReport, SourceScan, SourceScanner};
pub use syntax::{SyntaxFailure, SyntaxFailureKind};
pub use text::{size_proxy, strip_shebang, wrap_function_body};
