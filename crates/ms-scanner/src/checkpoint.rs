//! The in-flight package checkpoint.
//!
//! A large package can hold thousands of files. While its files are analyzed
//! the engine writes a [`Checkpoint`] after each one: the package's index key,
//! how many walked files are done, and the partial record. The package stays
//! pending in the index until it is committed, so a partial record is never
//! mistaken for a finished one.
//!
//! After a crash, a checkpoint whose key matches the next pending package lets
//! the engine skip the download and extraction and resume at the next file.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScanError;

/// Progress through one package's walked files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index key of the package being analyzed.
    pub key: String,
    /// Number of walked files already handed to the analyzer.
    pub processed: usize,
    /// The analyzer's record after those files.
    pub record: serde_json::Value,
}

impl Checkpoint {
    /// Captures progress after `processed` files.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Record`] if the record cannot be encoded.
    pub fn new<T: Serialize>(key: &str, processed: usize, record: &T) -> Result<Self, ScanError> {
        Ok(Self {
            key: key.to_owned(),
            processed,
            record: serde_json::to_value(record)?,
        })
    }

    /// Loads the checkpoint file, or `None` if there is none.
    ///
    /// A malformed file is discarded with a warning: the worst outcome is
    /// refetching one package.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Io`] if the file exists but cannot be read.
    pub async fn load(path: &Utf8Path) -> Result<Option<Self>, ScanError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ScanError::io(path, e)),
        };

        match serde_json::from_slice(&content) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                warn!(path = %path, error = %e, "Discarding malformed checkpoint");
                Ok(None)
            }
        }
    }

    /// Writes the checkpoint through a temporary file and a rename.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Io`] if writing or renaming fails.
    pub async fn store(&self, path: &Utf8Path) -> Result<(), ScanError> {
        let json = serde_json::to_vec(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| ScanError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| ScanError::io(path, e))
    }

    /// Removes the checkpoint file if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Io`] if the file exists but cannot be removed.
    pub async fn clear(path: &Utf8Path) -> Result<(), ScanError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScanError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use ms_core::ImportStats;
    use tempfile::TempDir;

    fn checkpoint_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("progress.json")).expect("utf8 temp dir")
    }

    #[tokio::test]
    async fn test_store_load_clear() {
        let dir = TempDir::new().expect("temp dir");
        let path = checkpoint_path(&dir);
        let stats = ImportStats {
            files: 3,
            relative: 2,
            ..ImportStats::default()
        };

        let checkpoint = Checkpoint::new("left-pad", 3, &stats).expect("checkpoint");
        checkpoint.store(&path).await.expect("store");

        let loaded = Checkpoint::load(&path).await.expect("load").expect("present");
        assert_eq!(loaded, checkpoint);
        let restored: ImportStats = serde_json::from_value(loaded.record).expect("record");
        assert_eq!(restored, stats);

        Checkpoint::clear(&path).await.expect("clear");
        assert!(Checkpoint::load(&path).await.expect("load").is_none());
        Checkpoint::clear(&path).await.expect("clear twice");
    }

    #[tokio::test]
    async fn test_malformed_checkpoint_is_discarded() {
        let dir = TempDir::new().expect("temp dir");
        let path = checkpoint_path(&dir);
        tokio::fs::write(&path, b"{not json").await.expect("write");
        assert!(Checkpoint::load(&path).await.expect("load").is_none());
    }
}
