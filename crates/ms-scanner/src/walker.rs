//! Directory traversal of an extracted package.
//!
//! This module provides [`FileWalker`], which uses the `ignore` crate to walk
//! the extracted tree while never descending into nested dependency folders.
//!
//! # Features
//!
//! - Prunes every directory named like the dependency folder (`node_modules`)
//! - Optional case-insensitive extension filter
//! - Visits hidden files and ignores `.gitignore` rules: published packages
//!   ship whatever they ship
//! - Deterministic, name-sorted order
//! - Converts paths to UTF-8 [`Utf8PathBuf`](camino::Utf8PathBuf)
//! - Unreadable entries are logged and skipped, never fatal

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tracing::warn;

/// A file walker over one extracted package.
///
/// # Examples
///
/// ```no_run
/// use ms_scanner::FileWalker;
/// use camino::Utf8Path;
///
/// let walker = FileWalker::new(Utf8Path::new("_work/package"), "node_modules")
///     .with_extension("js");
/// for path in walker.collect_paths() {
///     println!("{path}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Directory name never descended into.
    dependency_dir: String,
    /// Lowercased extension to keep, without the dot.
    extension: Option<String>,
}

impl FileWalker {
    /// Creates a walker for `root` that prunes `dependency_dir`.
    #[must_use]
    pub fn new(root: &Utf8Path, dependency_dir: &str) -> Self {
        Self {
            root: root.to_owned(),
            dependency_dir: dependency_dir.to_owned(),
            extension: None,
        }
    }

    /// Keeps only files with this extension, compared case-insensitively.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    /// Collects every matching regular file under the root.
    ///
    /// Entries the walk cannot read (a directory shipped without read
    /// permission, a broken link, a non-UTF-8 name) belong to one package
    /// only; they are logged and left out.
    #[must_use]
    pub fn collect_paths(&self) -> Vec<Utf8PathBuf> {
        let mut paths = Vec::new();

        for result in self.build_walker() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %self.root, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                warn!(path = %entry.path().display(), "Skipping non-UTF-8 path");
                continue;
            };

            if self.matches_extension(path) {
                paths.push(path.to_owned());
            }
        }

        paths
    }

    fn build_walker(&self) -> ignore::Walk {
        let dependency_dir = self.dependency_dir.clone();
        WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .threads(1)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir && entry.depth() > 0 && entry.file_name() == dependency_dir.as_str())
            })
            .build()
    }

    fn matches_extension(&self, path: &Utf8Path) -> bool {
        match &self.extension {
            None => true,
            Some(wanted) => path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted)),
        }
    }

    /// Returns `true` if any component of `path` is the dependency folder.
    #[must_use]
    pub fn is_dependency_path(&self, path: &Utf8Path) -> bool {
        path.components()
            .any(|component| component.as_str() == self.dependency_dir)
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        for file in files {
            let path = root.join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("mkdir");
            }
            std::fs::write(&path, b"").expect("write");
        }
        (dir, root)
    }

    fn relative(root: &Utf8Path, paths: &[Utf8PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).expect("under root").as_str().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_dependency_dirs_never_visited() {
        let (_dir, root) = tree(&[
            "package/index.js",
            "package/node_modules/dep/index.js",
            "package/lib/node_modules/x.js",
            "package/lib/util.js",
            "node_modules/top.js",
        ]);
        let walker = FileWalker::new(&root, "node_modules");
        let paths = walker.collect_paths();

        assert!(paths.iter().all(|p| !walker.is_dependency_path(p)));
        assert_eq!(
            relative(&root, &paths),
            vec!["package/index.js", "package/lib/util.js"]
        );
    }

    #[test]
    fn test_extension_filter_case_insensitive() {
        let (_dir, root) = tree(&["a.js", "b.JS", "c.json", "d.mjs", "e"]);
        let paths = FileWalker::new(&root, "node_modules")
            .with_extension("js")
            .collect_paths();
        assert_eq!(relative(&root, &paths), vec!["a.js", "b.JS"]);
    }

    #[test]
    fn test_hidden_and_ignored_files_included() {
        let (_dir, root) = tree(&[".hidden/a.js", ".gitignore", "b.js"]);
        std::fs::write(root.join(".gitignore"), b"b.js\n").expect("write");
        let paths = FileWalker::new(&root, "node_modules")
            .with_extension("js")
            .collect_paths();
        assert_eq!(relative(&root, &paths), vec![".hidden/a.js", "b.js"]);
    }

    #[test]
    fn test_file_named_like_dependency_dir_kept() {
        let (_dir, root) = tree(&["node_modules.js"]);
        let paths = FileWalker::new(&root, "node_modules")
            .collect_paths();
        assert_eq!(paths.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, root) = tree(&["a.js", "locked/b.js", "z.js"]);
        let locked = root.join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))
            .expect("chmod");

        let paths = FileWalker::new(&root, "node_modules").collect_paths();

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
            .expect("chmod back");
        // Root bypasses permission checks and still sees the locked file.
        let found = relative(&root, &paths);
        assert!(found.starts_with(&["a.js".to_owned()]));
        assert!(found.ends_with(&["z.js".to_owned()]));
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let (_dir, root) = tree(&[]);
        let paths = FileWalker::new(&root.join("absent"), "node_modules").collect_paths();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_is_dependency_path() {
        let walker = FileWalker::new(Utf8Path::new("."), "node_modules");
        assert!(walker.is_dependency_path(Utf8Path::new("package/node_modules/a.js")));
        assert!(!walker.is_dependency_path(Utf8Path::new("package/node_modules.js")));
    }
}
