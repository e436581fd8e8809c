//! Fast hash map and hash set type aliases.
//!
//! Package names and module specifiers are short strings looked up millions
//! of times over a full crawl, so the workspace uses the Fx hash algorithm
//! from `rustc-hash` instead of the standard library's SipHash. None of these
//! tables are exposed to untrusted key flooding: keys come from the registry
//! listing and from fixed configuration.
//!
//! # Examples
//!
//! ```
//! use ms_core::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
//!
//! let mut counts: FxHashMap<char, u64> = fx_hash_map();
//! *counts.entry('a').or_default() += 1;
//!
//! let mut builtins: FxHashSet<&str> = fx_hash_set();
//! builtins.insert("fs");
//! assert!(builtins.contains("fs"));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_counts() {
        let mut map: FxHashMap<char, u64> = fx_hash_map();
        for c in "left-pad".chars() {
            *map.entry(c).or_default() += 1;
        }
        assert_eq!(map.get(&'-'), Some(&1));
        assert_eq!(map.get(&'a'), Some(&1));
        assert_eq!(map.get(&'z'), None);
    }

    #[test]
    fn test_fx_hash_set_membership() {
        let set: FxHashSet<&str> = ["fs", "path"].into_iter().collect();
        assert!(set.contains("fs"));
        assert!(!set.contains("left-pad"));
    }
}
