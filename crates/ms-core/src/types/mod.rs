//! Domain types for the modspec crawler.
//!
//! # Module Organization
//!
//! - [`entry`] - Persisted index entries and index key encoding
//! - [`export`] - The export-shape record
//! - [`location`] - Source code locations
//! - [`specifier`] - Specifier categories
//! - [`stats`] - The per-package import statistics record
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use ms_core::{ImportStats, IndexEntry, SpecifierKind};
//! ```

pub mod entry;
pub mod export;
pub mod location;
pub mod specifier;
pub mod stats;

pub use entry::{IndexEntry, display_name, index_key};
pub use export::ExportShape;
pub use location::SourceLocation;
pub use specifier::SpecifierKind;
pub use stats::ImportStats;
