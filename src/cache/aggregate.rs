// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Aggregation cache
//!
//! Remembers the transformed content of every input of a stage that
//! combines many files into one, so an edit to one input only re-runs that
//! input's transforms. Entries are kept in path order, which is also the
//! order a from-scratch build visits the sorted glob results.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One input's contribution to the combined output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part<'a> {
    pub path: &'a Path,
    pub content: &'a [u8],
}

/// Counts from a commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub updated: usize,
    pub removed: usize,
}

/// Path → transformed content for one aggregating stage
#[derive(Debug, Default)]
pub struct AggregationCache {
    entries: BTreeMap<PathBuf, Vec<u8>>,
}

impl AggregationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parts the combined output would hold after merging `fresh` and
    /// keeping only `current` sources, without mutating the cache
    pub fn preview<'a>(
        &'a self,
        fresh: &'a BTreeMap<PathBuf, Vec<u8>>,
        current: &BTreeSet<PathBuf>,
    ) -> Vec<Part<'a>> {
        current
            .iter()
            .filter_map(|path| {
                fresh
                    .get_key_value(path)
                    .or_else(|| self.entries.get_key_value(path))
            })
            .map(|(path, content)| Part {
                path: path.as_path(),
                content: content.as_slice(),
            })
            .collect()
    }

    /// Merge fresh content and drop entries for sources that are gone
    pub fn commit(
        &mut self,
        fresh: BTreeMap<PathBuf, Vec<u8>>,
        current: &BTreeSet<PathBuf>,
    ) -> CommitSummary {
        let updated = fresh.len();
        self.entries.extend(fresh);

        let before = self.entries.len();
        self.entries.retain(|path, _| current.contains(path));

        CommitSummary {
            updated,
            removed: before - self.entries.len(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    fn fresh(items: &[(&str, &str)]) -> BTreeMap<PathBuf, Vec<u8>> {
        items
            .iter()
            .map(|(p, c)| (PathBuf::from(p), c.as_bytes().to_vec()))
            .collect()
    }

    fn joined(parts: &[Part<'_>]) -> String {
        parts
            .iter()
            .map(|p| String::from_utf8_lossy(p.content).to_string())
            .collect::<Vec<_>>()
            .join("|")
    }

    #[test]
    fn test_commit_keeps_path_order() {
        let mut cache = AggregationCache::new();
        let current = set(&["/b", "/a"]);
        cache.commit(fresh(&[("/b", "B"), ("/a", "A")]), &current);

        assert_eq!(joined(&cache.preview(&BTreeMap::new(), &current)), "A|B");
    }

    #[test]
    fn test_preview_reuses_unchanged_entries() {
        let mut cache = AggregationCache::new();
        let current = set(&["/a", "/b"]);
        cache.commit(fresh(&[("/a", "red"), ("/b", "blue")]), &current);

        let update = fresh(&[("/a", "green")]);
        let preview = cache.preview(&update, &current);
        assert_eq!(joined(&preview), "green|blue");

        // preview alone leaves the cache untouched
        assert_eq!(joined(&cache.preview(&BTreeMap::new(), &current)), "red|blue");
    }

    #[test]
    fn test_commit_purges_deleted_sources() {
        let mut cache = AggregationCache::new();
        cache.commit(fresh(&[("/a", "A"), ("/b", "B")]), &set(&["/a", "/b"]));

        let summary = cache.commit(BTreeMap::new(), &set(&["/a"]));
        assert_eq!(summary, CommitSummary { updated: 0, removed: 1 });
        assert!(!cache.contains(Path::new("/b")));
        assert_eq!(joined(&cache.preview(&BTreeMap::new(), &set(&["/a", "/b"]))), "A");
    }
}
