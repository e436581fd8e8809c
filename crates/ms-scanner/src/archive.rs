//! Working-folder management: stale archive sweep, extraction folder reset,
//! and archive unpacking.
//!
//! The working folder holds at most one archive and one extracted tree at a
//! time. Everything here runs between a download and the analysis of the
//! package it belongs to.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::ScanError;

/// Returns `true` for file names ending in `.tgz` or `.tar.gz`, ignoring case.
///
/// # Examples
///
/// ```
/// use ms_scanner::archive::is_archive_name;
///
/// assert!(is_archive_name("left-pad-1.3.0.tgz"));
/// assert!(is_archive_name("x.TAR.GZ"));
/// assert!(!is_archive_name("data.json"));
/// ```
#[must_use]
pub fn is_archive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".tgz") || lower.ends_with(".tar.gz")
}

/// Deletes leftover archives directly inside the working folder.
///
/// Returns the number of files removed.
///
/// # Errors
///
/// Returns [`ScanError::Io`] if the folder cannot be listed or a file cannot
/// be removed.
pub async fn sweep_stale_archives(dir: &Utf8Path) -> Result<usize, ScanError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ScanError::io(dir, e))?;

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await.map_err(|e| ScanError::io(dir, e))? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_archive_name(&name) {
            continue;
        }
        let is_file = entry
            .file_type()
            .await
            .map_err(|e| ScanError::io(dir.join(&name), e))?
            .is_file();
        if is_file {
            let path = dir.join(&name);
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| ScanError::io(&path, e))?;
            debug!(path = %path, "Removed stale archive");
            removed += 1;
        }
    }

    Ok(removed)
}

/// Deletes and recreates the extraction folder.
///
/// A missing folder is fine. A folder that cannot be deleted because it is
/// still not empty is [`ScanError::StaleWorkTree`] and must be cleared by the
/// operator; it is never retried.
///
/// # Errors
///
/// Returns [`ScanError::StaleWorkTree`] or [`ScanError::Io`].
pub async fn reset_extract_dir(path: &Utf8Path) -> Result<(), ScanError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
            return Err(ScanError::StaleWorkTree {
                path: path.to_owned(),
                source: e,
            });
        }
        Err(e) => return Err(ScanError::io(path, e)),
    }

    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| ScanError::io(path, e))
}

/// Unpacks a gzip-compressed tar archive into `dest`.
///
/// Entries that would escape `dest` are skipped by the tar reader. Failures
/// of the working folder itself (permissions, full or read-only disk) are
/// fatal; anything else means the archive is unusable and is
/// [`ScanError::PackageRejected`].
///
/// # Errors
///
/// Returns [`ScanError::PackageRejected`], [`ScanError::Io`] or
/// [`ScanError::Join`].
pub async fn extract_archive(archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ScanError> {
    let archive: Utf8PathBuf = archive.to_owned();
    let dest: Utf8PathBuf = dest.to_owned();

    tokio::task::spawn_blocking(move || unpack(&archive, &dest)).await?
}

fn unpack(archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ScanError> {
    let file = std::fs::File::open(archive).map_err(|e| ScanError::io(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(io::BufReader::new(file)));
    tar.set_preserve_permissions(false);
    tar.set_overwrite(true);

    tar.unpack(dest).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::StorageFull
        | io::ErrorKind::ReadOnlyFilesystem
        | io::ErrorKind::OutOfMemory => ScanError::io(dest, e),
        _ => ScanError::PackageRejected("Archive could not be extracted".to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir")
    }

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .expect("append");
        }
        builder
            .into_inner()
            .expect("tar")
            .finish()
            .expect("gzip")
    }

    #[test]
    fn test_is_archive_name() {
        assert!(is_archive_name("a.tgz"));
        assert!(is_archive_name("a.TGZ"));
        assert!(is_archive_name("a.tar.gz"));
        assert!(!is_archive_name("a.gz"));
        assert!(!is_archive_name("a.tar"));
        assert!(!is_archive_name("tgz"));
    }

    #[tokio::test]
    async fn test_sweep_stale_archives() {
        let dir = TempDir::new().expect("temp dir");
        let root = utf8_dir(&dir);
        std::fs::write(root.join("old-1.0.0.tgz"), b"x").expect("write");
        std::fs::write(root.join("older.TAR.GZ"), b"x").expect("write");
        std::fs::write(root.join("data.json"), b"{}").expect("write");
        std::fs::create_dir(root.join("package")).expect("mkdir");

        let removed = sweep_stale_archives(&root).await.expect("sweep");
        assert_eq!(removed, 2);
        assert!(root.join("data.json").exists());
        assert!(root.join("package").exists());
        assert!(!root.join("old-1.0.0.tgz").exists());
    }

    #[tokio::test]
    async fn test_reset_extract_dir() {
        let dir = TempDir::new().expect("temp dir");
        let target = utf8_dir(&dir).join("package");

        reset_extract_dir(&target).await.expect("create fresh");
        std::fs::create_dir_all(target.join("package/lib")).expect("mkdir");
        std::fs::write(target.join("package/lib/a.js"), b"1").expect("write");

        reset_extract_dir(&target).await.expect("clear");
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target).expect("read").count(), 0);
    }

    #[tokio::test]
    async fn test_extract_archive() {
        let dir = TempDir::new().expect("temp dir");
        let root = utf8_dir(&dir);
        let archive = root.join("pkg-1.0.0.tgz");
        std::fs::write(
            &archive,
            tarball(&[("package/index.js", "require('fs');"), ("package/lib/a.js", "")]),
        )
        .expect("write");

        let dest = root.join("package");
        reset_extract_dir(&dest).await.expect("reset");
        extract_archive(&archive, &dest).await.expect("extract");

        assert!(dest.join("package/index.js").is_file());
        assert!(dest.join("package/lib/a.js").is_file());
    }

    #[tokio::test]
    async fn test_extract_corrupt_archive_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let root = utf8_dir(&dir);
        let archive = root.join("broken.tgz");
        std::fs::write(&archive, b"definitely not gzip").expect("write");

        let err = extract_archive(&archive, &root).await.expect_err("corrupt");
        assert!(err.is_recoverable(), "{err}");
    }
}
