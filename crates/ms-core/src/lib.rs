//! Core types, configuration, and errors for the modspec registry crawler.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Config`] and its sections, carrying the fixed lookup tables
//!   (built-in module names, specifier rules) as injectable configuration
//! - [`ConfigError`] for configuration loading failures
//! - Domain types: [`SpecifierKind`], the per-package [`ImportStats`] and
//!   [`ExportShape`] records, and the persisted [`IndexEntry`]
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{
    ClassifierConfig, Config, NODE_BUILTIN_MODULES, ProbeConfig, ReportConfig, ScanConfig,
    ScanVariant,
};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::{
    ExportShape, ImportStats, IndexEntry, SourceLocation, SpecifierKind, display_name, index_key,
};
