//! Resumable registry crawler: fetch, extract, walk and analyze packages.
//!
//! This crate drives a long-running crawl over every package in an
//! npm-compatible registry, one package at a time, and survives being killed
//! at any point.
//!
//! # Overview
//!
//! The main entry point is [`ScanEngine`], which combines:
//!
//! - [`PackageIndex`]: the shuffled, persisted work queue and result store
//! - [`Registry`]: listing, manifest and archive transport
//! - [`FileWalker`]: traversal of the extracted tree, skipping dependencies
//! - [`Analyzer`]: the pluggable measurement, per file or per package
//!
//! The reports ([`ModuleSpecReport`], [`ExportShapeReport`],
//! [`NameCharacterReport`]) are pure functions over the index.
//!
//! # Example
//!
//! ```no_run
//! use ms_core::{ClassifierConfig, ScanConfig};
//! use ms_scanner::{ImportClassifier, RegistryClient, ScanEngine};
//!
//! # async fn run() -> Result<(), ms_scanner::ScanError> {
//! let config = ScanConfig::default();
//! let registry = RegistryClient::new(&config.registry_url)?;
//! let analyzer = ImportClassifier::new(&ClassifierConfig::default())?;
//!
//! let mut engine = ScanEngine::new(config, registry, analyzer);
//! engine.open().await?;
//! let result = engine.run(10).await;
//! engine.close().await?;
//! result?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ScanEngine::next (one package)
//!     │
//!     ├── Registry::fetch_manifest      404 → {"error": ...}
//!     ├── Registry::download_archive    404 → {"error": ...}
//!     ├── archive::extract_archive      corrupt → {"error": ...}
//!     │
//!     ├── FileWalker (ignore crate, dependency dirs pruned)
//!     │       │
//!     │       └── Analyzer::on_file     checkpoint after each file
//!     │
//!     └── PackageIndex::commit + persist
//! ```
//!
//! # Failure Containment
//!
//! - **Package-local**: missing metadata, missing archive, corrupt archive
//!   and analyzer rejections are committed as error records; the run goes on
//! - **File-local**: unreadable or unparsable files, and entries the walk
//!   cannot enter, are skipped
//! - **Fatal**: any other registry or filesystem failure stops the run; the
//!   index on disk stays at the last committed package

#![deny(clippy::all)]
#![warn(missing_docs)]

mod analyzer;
pub mod archive;
mod checkpoint;
mod error;
mod index;
mod probe;
pub mod registry;
mod report;
mod shuffle;
mod walker;

pub use analyzer::{Analyzer, AnalyzerMode, ImportClassifier, PackageContext};
pub use checkpoint::Checkpoint;
pub use error::{FetchError, ScanError};
pub use index::PackageIndex;
pub use probe::ExportShapeProbe;
pub use registry::{Registry, RegistryClient};
pub use report::{ExportShapeReport, ModuleSpecReport, NameCharacterReport};
pub use shuffle::shuffle_names;
pub use walker::FileWalker;

use std::time::Duration;

use camino::Utf8Path;
use ms_core::{IndexEntry, ScanConfig, display_name};
use tracing::{debug, info, warn};

/// Error record for a package whose manifest is missing.
pub const METADATA_MISSING: &str = "Package metadata does not exist";

/// Error record for a manifest without `dist.tarball`.
pub const ARCHIVE_REFERENCE_MISSING: &str = "Metadata does not contain an archive reference";

/// Error record for a package whose archive is missing.
pub const ARCHIVE_MISSING: &str = "Archive does not exist";

/// What one call to [`ScanEngine::next`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The package was analyzed and its record committed.
    Analyzed {
        /// Registry name.
        name: String,
    },
    /// The package was committed as an error record.
    Failed {
        /// Registry name.
        name: String,
        /// The committed reason.
        reason: String,
    },
    /// No pending package is left.
    Exhausted,
}

/// Drives the crawl: one package per [`next`](Self::next) call.
///
/// The engine owns the working folder for its whole lifetime: the index file,
/// at most one downloaded archive, the extracted tree, and the in-flight
/// [`Checkpoint`]. Everything runs sequentially; there is never more than one
/// package on disk.
///
/// # Lifecycle
///
/// [`open`](Self::open) loads the index (building it from the registry
/// listing on first use), [`next`](Self::next), [`skip`](Self::skip) and
/// [`reset`](Self::reset) mutate it, and [`close`](Self::close) flushes and
/// releases it. Calling `open` twice or mutating before `open` is an error.
#[derive(Debug)]
pub struct ScanEngine<R, A> {
    /// Working folder layout and pacing.
    config: ScanConfig,
    /// Registry transport.
    registry: R,
    /// The per-package measurement.
    analyzer: A,
    /// The open index, if any.
    index: Option<PackageIndex>,
    /// Lowest position that may still be pending.
    cursor: usize,
}

impl<R: Registry, A: Analyzer> ScanEngine<R, A> {
    /// Creates a closed engine.
    #[must_use]
    pub const fn new(config: ScanConfig, registry: R, analyzer: A) -> Self {
        Self {
            config,
            registry,
            analyzer,
            index: None,
            cursor: 0,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns the analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Returns `true` if the index is loaded.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.index.is_some()
    }

    /// Returns the open index.
    #[must_use]
    pub const fn index(&self) -> Option<&PackageIndex> {
        self.index.as_ref()
    }

    fn index_mut(&mut self) -> Result<&mut PackageIndex, ScanError> {
        self.index.as_mut().ok_or(ScanError::NotOpen)
    }

    /// Loads the index, building it from the registry listing if the index
    /// file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AlreadyOpen`] if called twice, and any error
    /// raised while loading or building the index.
    pub async fn open(&mut self) -> Result<(), ScanError> {
        if self.index.is_some() {
            return Err(ScanError::AlreadyOpen);
        }

        let path = self.config.index_path();
        let index = match PackageIndex::load(&path).await? {
            Some(index) => index,
            None => self.initialize().await?,
        };

        info!(
            path = %path,
            packages = index.len(),
            pending = index.pending_count(),
            "Opened package index"
        );
        self.index = Some(index);
        self.cursor = 0;
        Ok(())
    }

    /// Fetches the full listing, shuffles it and persists the new index.
    ///
    /// The listing is the most expensive request of the crawl, so the index
    /// is written before anything else happens.
    async fn initialize(&self) -> Result<PackageIndex, ScanError> {
        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| ScanError::io(&self.config.work_dir, e))?;

        info!(registry = %self.config.registry_url, "Fetching registry listing");
        let names = self.registry.fetch_listing().await?;
        info!(packages = names.len(), "Shuffling package names");

        let shuffled = shuffle_names(names, &mut rand::thread_rng());
        let mut index = PackageIndex::from_names(self.config.index_path(), shuffled);
        index.persist().await?;
        Checkpoint::clear(&self.config.checkpoint_path()).await?;
        Ok(index)
    }

    /// Writes the index to disk.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotOpen`] before [`open`](Self::open).
    pub async fn save(&mut self) -> Result<(), ScanError> {
        self.index_mut()?.persist().await
    }

    /// Releases the index, writing it first only if it changed since it was
    /// last written. Read-only sessions leave the file untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotOpen`] before [`open`](Self::open).
    pub async fn close(&mut self) -> Result<(), ScanError> {
        self.index_mut()?.persist_if_dirty().await?;
        self.index = None;
        debug!("Closed package index");
        Ok(())
    }

    /// Clears entries back to pending and persists the index.
    ///
    /// See [`PackageIndex::reset`] for the predicate semantics.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotOpen`] before [`open`](Self::open).
    pub async fn reset(
        &mut self,
        predicate: Option<&mut dyn FnMut(&serde_json::Value, &str) -> bool>,
    ) -> Result<usize, ScanError> {
        let index = self.index_mut()?;
        let cleared = index.reset(predicate);
        index.persist().await?;
        Checkpoint::clear(&self.config.checkpoint_path()).await?;
        self.cursor = 0;

        info!(cleared, "Reset package index");
        Ok(cleared)
    }

    /// Marks the next pending package `{}` without fetching anything.
    ///
    /// Returns the skipped name, or `None` if nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotOpen`] before [`open`](Self::open).
    pub async fn skip(&mut self) -> Result<Option<String>, ScanError> {
        let cursor = self.cursor;
        let index = self.index_mut()?;
        let Some((position, key)) = index.first_pending(cursor) else {
            return Ok(None);
        };
        let key = key.to_owned();

        index.commit(&key, IndexEntry::skipped());
        index.persist().await?;
        Checkpoint::clear(&self.config.checkpoint_path()).await?;
        self.cursor = position + 1;

        let name = display_name(&key).to_owned();
        info!(package = %name, "Skipped package");
        Ok(Some(name))
    }

    /// Processes up to `count` pending packages, pausing between them.
    ///
    /// Returns how many packages were committed.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error; everything committed before it is
    /// already on disk.
    pub async fn run(&mut self, count: usize) -> Result<usize, ScanError> {
        let delay = Duration::from_millis(self.config.delay_ms);
        let mut committed = 0;

        for i in 0..count {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.next().await? == Step::Exhausted {
                info!("No pending packages left");
                break;
            }
            committed += 1;
        }

        let index = self.index_mut()?;
        info!(
            committed,
            failed = index.failed_count(),
            pending = index.pending_count(),
            "Run finished"
        );
        Ok(committed)
    }

    /// Processes the next pending package.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotOpen`] before [`open`](Self::open), and any
    /// fatal error raised while processing. Soft failures are committed as
    /// error records and reported as [`Step::Failed`].
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Result<Step, ScanError> {
        let cursor = self.cursor;
        let index = self.index_mut()?;
        let total = index.len();
        let Some((position, key)) = index.first_pending(cursor) else {
            return Ok(Step::Exhausted);
        };
        let key = key.to_owned();
        let name = display_name(&key).to_owned();
        self.cursor = position;

        info!(
            "Processing package {name} ({} of {total}, {:.2}%)",
            position + 1,
            progress_percent(position + 1, total)
        );

        let entry = self.process(&key, &name).await?;
        let step = match entry.error() {
            Some(reason) => {
                warn!(package = %name, reason, "Package skipped");
                Step::Failed {
                    name,
                    reason: reason.to_owned(),
                }
            }
            None => Step::Analyzed { name },
        };

        let index = self.index_mut()?;
        index.commit(&key, entry);
        index.persist().await?;
        Checkpoint::clear(&self.config.checkpoint_path()).await?;
        self.cursor = position + 1;

        Ok(step)
    }

    /// Fetches, extracts and analyzes one package, returning its entry.
    async fn process(&mut self, key: &str, name: &str) -> Result<IndexEntry, ScanError> {
        let root = self.config.extract_path();
        let resume = self.resume_point(key, &root).await?;

        if resume.is_none() {
            if let Some(reason) = self.fetch_package(name, &root).await? {
                return Ok(IndexEntry::failed(reason));
            }
        }

        let package = PackageContext { name, root: &root };
        match self.analyzer.mode() {
            AnalyzerMode::Files => {
                let record = self.analyze_files(key, &package, resume).await?;
                Ok(IndexEntry::done(&record)?)
            }
            AnalyzerMode::Package => match self.analyzer.on_package(&package).await {
                Ok(record) => Ok(IndexEntry::done(&record)?),
                Err(ScanError::PackageRejected(reason)) => Ok(IndexEntry::failed(reason)),
                Err(e) => Err(e),
            },
        }
    }

    /// Returns the checkpointed record and file count if the last run died
    /// inside this package and its extracted tree is still on disk.
    async fn resume_point(
        &self,
        key: &str,
        root: &Utf8Path,
    ) -> Result<Option<(A::Record, usize)>, ScanError> {
        if self.analyzer.mode() != AnalyzerMode::Files || !self.config.persist_every_file {
            return Ok(None);
        }
        let Some(checkpoint) = Checkpoint::load(&self.config.checkpoint_path()).await? else {
            return Ok(None);
        };
        if checkpoint.key != key || !tokio::fs::try_exists(root).await.unwrap_or(false) {
            return Ok(None);
        }

        match serde_json::from_value(checkpoint.record) {
            Ok(record) => {
                info!(files = checkpoint.processed, "Resuming package from checkpoint");
                Ok(Some((record, checkpoint.processed)))
            }
            Err(e) => {
                warn!(error = %e, "Checkpoint record does not match the analyzer");
                Ok(None)
            }
        }
    }

    /// Downloads and extracts a package into `root`.
    ///
    /// Returns the error record to commit when the package cannot be
    /// fetched, or `None` once the tree is in place.
    async fn fetch_package(
        &self,
        name: &str,
        root: &Utf8Path,
    ) -> Result<Option<String>, ScanError> {
        let manifest = match self.registry.fetch_manifest(name).await {
            Ok(manifest) => manifest,
            Err(e) if e.is_not_found() => return Ok(Some(METADATA_MISSING.to_owned())),
            Err(e) => return Err(e.into()),
        };
        let Some(url) = manifest
            .pointer("/dist/tarball")
            .and_then(serde_json::Value::as_str)
        else {
            return Ok(Some(ARCHIVE_REFERENCE_MISSING.to_owned()));
        };

        let work_dir = &self.config.work_dir;
        let swept = archive::sweep_stale_archives(work_dir).await?;
        if swept > 0 {
            debug!(swept, "Removed stale archives");
        }

        debug!(url, "Downloading archive");
        let archive_path = self.config.archive_path();
        match self.registry.download_archive(url, &archive_path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(Some(ARCHIVE_MISSING.to_owned())),
            Err(e) => return Err(e.into()),
        }

        archive::reset_extract_dir(root).await?;
        let extracted = archive::extract_archive(&archive_path, root).await;
        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            debug!(path = %archive_path, error = %e, "Archive left for the next sweep");
        }

        match extracted {
            Ok(()) => Ok(None),
            Err(ScanError::PackageRejected(reason)) => Ok(Some(reason)),
            Err(e) => Err(e),
        }
    }

    /// Hands every walked file to the analyzer, checkpointing after each.
    async fn analyze_files(
        &mut self,
        key: &str,
        package: &PackageContext<'_>,
        resume: Option<(A::Record, usize)>,
    ) -> Result<A::Record, ScanError> {
        let mut walker = FileWalker::new(package.root, &self.config.dependency_dir);
        if let Some(extension) = self.analyzer.source_extension() {
            walker = walker.with_extension(extension);
        }
        let paths = tokio::task::spawn_blocking(move || walker.collect_paths()).await?;
        debug!(files = paths.len(), "Collected package files");

        let (mut record, done) = resume.unwrap_or_default();
        let checkpoint_path = self.config.checkpoint_path();

        for (i, path) in paths.iter().enumerate().skip(done) {
            match self.analyzer.on_file(path, &mut record, package).await {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(path = %package.relative(path), error = %e, "Skipping file");
                }
                Err(e) => return Err(e),
            }

            if self.config.persist_every_file {
                Checkpoint::new(key, i + 1, &record)?
                    .store(&checkpoint_path)
                    .await?;
            }
        }

        Ok(record)
    }
}

/// `done / total * 100`, or 0 for an empty index.
#[allow(clippy::cast_precision_loss)] // Acceptable for progress display
fn progress_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    done as f64 / total as f64 * 100.0
}
