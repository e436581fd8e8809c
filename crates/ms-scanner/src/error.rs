//! Error types for the ms-scanner crate.
//!
//! This module provides [`FetchError`] for registry transport failures and
//! [`ScanError`] for everything the engine can raise.

use camino::Utf8PathBuf;

/// Errors from a single registry request.
///
/// A 404 is kept apart from every other status because the engine turns it
/// into an inline error record instead of stopping the run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The registry answered 404.
    #[error("HTTP 404: Not Found ({url})")]
    NotFound {
        /// The requested URL.
        url: String,
    },

    /// The registry answered with any other non-success status.
    #[error("HTTP {code}: {reason} ({url})")]
    Status {
        /// The numeric status code.
        code: u16,
        /// The canonical reason phrase.
        reason: String,
        /// The requested URL.
        url: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body is not the expected JSON.
    #[error("malformed response from {url}: {source}")]
    Decode {
        /// The requested URL.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing a downloaded body to disk failed.
    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Returns `true` for a 404 response.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that can occur during scanning operations.
///
/// # Error Recovery Strategy
///
/// - **File-local** ([`ScanError::Read`]): log a warning, skip the file,
///   continue with the package
/// - **Package-local** ([`ScanError::PackageRejected`]): commit an error
///   record for the package, continue with the next one
/// - **Operational** (fetch, filesystem, index): fatal, stop the run; all
///   previously committed entries stay durable
/// - **Programmer errors** ([`ScanError::AlreadyOpen`], [`ScanError::NotOpen`],
///   [`ScanError::HookNotSupplied`]): fatal, raised immediately
///
/// # Examples
///
/// ```
/// use ms_scanner::ScanError;
///
/// fn handle_error(err: &ScanError) {
///     if err.is_recoverable() {
///         eprintln!("skipping: {err}");
///     } else {
///         eprintln!("stopping: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// `open()` was called on an engine that is already open.
    #[error("package index is already open")]
    AlreadyOpen,

    /// An operation needed the index before `open()` was called.
    #[error("package index is not open")]
    NotOpen,

    /// The analyzer does not implement the hook its mode requires.
    #[error("analyzer does not supply the {0} hook")]
    HookNotSupplied(&'static str),

    /// A registry request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The index file could not be read or written.
    #[error("failed to access index file {path}: {source}")]
    Index {
        /// The index file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The index file is not a JSON object.
    #[error("malformed index file {path}: {source}")]
    IndexFormat {
        /// The index file path.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An analyzer record could not be serialized.
    #[error("failed to encode record: {0}")]
    Record(#[from] serde_json::Error),

    /// The extraction folder could not be cleared because it is not empty.
    ///
    /// Never retried: analyzing an uncleared tree would mix two packages.
    #[error("unable to clear package folder {path}, try removing the folder manually: {source}")]
    StaleWorkTree {
        /// The extraction folder.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation in the working folder failed.
    #[error("filesystem operation failed on {path}: {source}")]
    Io {
        /// The path being operated on.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read one source file.
    ///
    /// Scanning can continue by skipping this file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The package cannot be analyzed; recorded as an error entry.
    #[error("{0}")]
    PackageRejected(String),

    /// The parser could not be set up.
    #[error("parser failure: {0}")]
    Parse(#[from] ms_js_parser::ParseError),

    /// An external command could not be started.
    #[error("failed to run {program}: {source}")]
    Command {
        /// The program name.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// Creates a new [`ScanError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    ///
    /// Recoverable errors concern one file or one package and never the
    /// registry or the working folder.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::PackageRejected(_))
    }

    /// Returns `true` if this error is fatal (scanning should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. }
            | Self::Io { path, .. }
            | Self::Index { path, .. }
            | Self::IndexFormat { path, .. }
            | Self::StaleWorkTree { path, .. } => Some(path),
            _ => None,
        }
    }
}
