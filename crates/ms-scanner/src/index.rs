//! The persisted, shuffled package index.
//!
//! This module provides [`PackageIndex`]: the shuffle order of every package
//! name plus each name's [`IndexEntry`]. The JSON file it is saved to is the
//! crawler's only durable state.
//!
//! # File Format
//!
//! One JSON object whose keys are index keys in shuffle order:
//!
//! ```json
//! {"left-pad": null, ".1337": {"error": "Archive does not exist"}, "chalk": {"modules": 3}}
//! ```
//!
//! Key order *is* the shuffle order, so serialization walks the stored order
//! rather than the hash map.
//!
//! # Examples
//!
//! ```
//! use ms_core::IndexEntry;
//! use ms_scanner::PackageIndex;
//!
//! let mut index = PackageIndex::from_names("_work/data.json", ["left-pad", "1337"]);
//! assert_eq!(index.key_at(1), Some(".1337"));
//!
//! let (position, key) = index.first_pending(0).expect("pending");
//! assert_eq!((position, key), (0, "left-pad"));
//!
//! index.commit("left-pad", IndexEntry::skipped());
//! assert_eq!(index.pending_count(), 1);
//! ```

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use ms_core::{FxHashMap, IndexEntry, display_name, fx_hash_map, index_key};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScanError;

/// Ordered map from index key to [`IndexEntry`], bound to its file.
///
/// Invariant: every key in the order has exactly one entry and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageIndex {
    path: Utf8PathBuf,
    order: Vec<String>,
    entries: FxHashMap<String, IndexEntry>,
    dirty: bool,
}

impl PackageIndex {
    /// Creates an all-pending index over registry names, keeping their order.
    ///
    /// Names are converted with [`index_key`]; duplicates keep their first
    /// position.
    pub fn from_names<I, S>(path: impl Into<Utf8PathBuf>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Entries::default();
        for name in names {
            entries.insert(index_key(name.as_ref()), IndexEntry::Pending);
        }
        Self {
            path: path.into(),
            order: entries.order,
            entries: entries.map,
            dirty: true,
        }
    }

    /// Loads the index file, or returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Index`] if the file cannot be read and
    /// [`ScanError::IndexFormat`] if it is not a JSON object.
    pub async fn load(path: &Utf8Path) -> Result<Option<Self>, ScanError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ScanError::Index {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        let entries: Entries =
            serde_json::from_slice(&content).map_err(|source| ScanError::IndexFormat {
                path: path.to_owned(),
                source,
            })?;

        debug!(path = %path, packages = entries.order.len(), "Loaded package index");
        Ok(Some(Self {
            path: path.to_owned(),
            order: entries.order,
            entries: entries.map,
            dirty: false,
        }))
    }

    /// Writes the index to its file.
    ///
    /// The JSON is written to a sibling temporary file which is then renamed
    /// over the index, so a crash mid-write leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Index`] if writing or renaming fails.
    pub async fn persist(&mut self) -> Result<(), ScanError> {
        let json = serde_json::to_vec(&*self)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| ScanError::Index {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| ScanError::Index {
                path: self.path.clone(),
                source,
            })?;

        self.dirty = false;
        Ok(())
    }

    /// Writes the index only if it changed since the last write or load.
    ///
    /// # Errors
    ///
    /// See [`persist`](Self::persist).
    pub async fn persist_if_dirty(&mut self) -> Result<(), ScanError> {
        if self.dirty {
            self.persist().await?;
        }
        Ok(())
    }

    /// Returns the index file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns `true` if there are unsaved changes.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the number of packages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the index has no packages.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the key at a shuffle position.
    #[must_use]
    pub fn key_at(&self, position: usize) -> Option<&str> {
        self.order.get(position).map(String::as_str)
    }

    /// Returns the entry for an index key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Returns the entry for a registry package name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&IndexEntry> {
        self.get(&index_key(name))
    }

    /// Finds the first pending entry at or after `from`.
    ///
    /// Returns its position and key.
    #[must_use]
    pub fn first_pending(&self, from: usize) -> Option<(usize, &str)> {
        self.order
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, key)| self.entries.get(*key).is_some_and(IndexEntry::is_pending))
            .map(|(position, key)| (position, key.as_str()))
    }

    /// Stores the entry for an existing key.
    ///
    /// Unknown keys are ignored; the key set never changes after creation.
    pub fn commit(&mut self, key: &str, entry: IndexEntry) {
        if let Some(slot) = self.entries.get_mut(key) {
            *slot = entry;
            self.dirty = true;
        }
    }

    /// Clears entries back to pending.
    ///
    /// With no predicate every entry is cleared. With a predicate, only
    /// analyzed entries for which `predicate(record, name)` holds are
    /// cleared; error entries and pending entries are left alone.
    ///
    /// Returns the number of entries that changed.
    pub fn reset(
        &mut self,
        mut predicate: Option<&mut dyn FnMut(&serde_json::Value, &str) -> bool>,
    ) -> usize {
        let mut cleared = 0;
        for key in &self.order {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            let clear = match &*entry {
                IndexEntry::Pending => false,
                IndexEntry::Failed { .. } => predicate.is_none(),
                IndexEntry::Done(record) => match predicate.as_mut() {
                    Some(predicate) => predicate(record, display_name(key)),
                    None => true,
                },
            };
            if clear {
                *entry = IndexEntry::Pending;
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.dirty = true;
        }
        cleared
    }

    /// Iterates over `(key, entry)` pairs in shuffle order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entry| (key.as_str(), entry)))
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_pending()).count()
    }

    /// Returns the number of error entries.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|e| e.error().is_some()).count()
    }
}

impl Serialize for PackageIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (key, entry) in self.iter() {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// Insertion-ordered entries, as read from the index file.
#[derive(Default)]
struct Entries {
    order: Vec<String>,
    map: FxHashMap<String, IndexEntry>,
}

impl Entries {
    fn insert(&mut self, key: String, entry: IndexEntry) {
        if self.map.insert(key.clone(), entry).is_none() {
            self.order.push(key);
        }
    }
}

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = Entries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a package index object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let capacity = access.size_hint().unwrap_or(0);
        let mut entries = Entries {
            order: Vec::with_capacity(capacity),
            map: fx_hash_map(),
        };
        while let Some((key, entry)) = access.next_entry::<String, IndexEntry>()? {
            entries.insert(key, entry);
        }
        Ok(entries)
    }
}
