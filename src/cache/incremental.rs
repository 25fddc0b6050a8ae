// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Incremental filter
//!
//! Decides per source file whether it must go through its stage's
//! transforms. One-to-one stages compare modification times against the
//! corresponding output; aggregating stages compare content markers
//! against the set of files already folded into the combined output.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{FileRecord, FileStamp};

/// Why a file was (or was not) admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// Output is at least as new as the source
    Fresh,
    /// Output does not exist
    MissingOutput,
    /// Source is newer than the output
    Newer,
    /// Metadata could not be read; treated as stale
    Unreadable(String),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Compare a source against its output
pub fn check(source: &Path, output: &Path) -> Staleness {
    let output_mtime = match std::fs::metadata(output).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(e) if e.kind() == ErrorKind::NotFound => return Staleness::MissingOutput,
        Err(e) => {
            tracing::warn!(output = %output.display(), "destination unreadable, rebuilding: {}", e);
            return Staleness::Unreadable(e.to_string());
        }
    };

    match std::fs::metadata(source).and_then(|m| m.modified()) {
        Ok(source_mtime) if source_mtime > output_mtime => Staleness::Newer,
        Ok(_) => Staleness::Fresh,
        Err(e) => Staleness::Unreadable(e.to_string()),
    }
}

/// `mtime(source) > mtime(output)`, or the output is missing or unreadable
pub fn is_stale(source: &Path, output: &Path) -> bool {
    check(source, output).is_stale()
}

/// Per-stage record of every source file seen so far
#[derive(Debug, Default)]
pub struct IncrementalFilter {
    records: BTreeMap<PathBuf, FileRecord>,
}

impl IncrementalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregating stages: stale when never seen or the content changed
    pub fn is_unseen(&self, source: &Path, marker: &str) -> bool {
        self.records
            .get(source)
            .map_or(true, |record| record.marker.as_deref() != Some(marker))
    }

    /// Recorded with the same stamp, so its last marker still holds
    pub fn is_unchanged(&self, path: &Path, stamp: Option<FileStamp>) -> bool {
        stamp.is_some() && self.records.get(path).is_some_and(|record| record.stamp == stamp)
    }

    /// Marker of a file whose stamp has not moved since it was recorded
    pub fn known_marker(&self, path: &Path, stamp: Option<FileStamp>) -> Option<&str> {
        if !self.is_unchanged(path, stamp) {
            return None;
        }
        self.records.get(path).and_then(|record| record.marker.as_deref())
    }

    /// Store or replace the record for a source
    pub fn record(&mut self, record: FileRecord) {
        self.records.insert(record.path.clone(), record);
    }

    /// Records whose source is no longer part of `current`
    pub fn missing_from(&self, current: &BTreeSet<PathBuf>) -> Vec<FileRecord> {
        self.records
            .values()
            .filter(|record| !current.contains(&record.path))
            .cloned()
            .collect()
    }

    /// Drop the record of a deleted source
    pub fn forget(&mut self, source: &Path) -> Option<FileRecord> {
        self.records.remove(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
