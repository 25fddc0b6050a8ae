// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Incremental build state
//!
//! In-memory, process-scoped state that lets a stage skip work it has
//! already done. Nothing here is persisted: the destination tree is
//! always reconstructible from sources.

mod aggregate;
mod hash;
pub mod incremental;

pub use aggregate::{AggregationCache, CommitSummary, Part};
pub use hash::hash_bytes;
pub use incremental::{is_stale, IncrementalFilter, Staleness};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Size and modification time of a file. A file whose stamp has not moved
/// since it was last processed is not read again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

impl FileStamp {
    /// Stamp of a file on disk, if its metadata is readable
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok()?,
            len: meta.len(),
        })
    }
}

/// What the pipeline last knew about one tracked file. For aggregating
/// stages the transformed content lives in the stage's
/// [`AggregationCache`] under the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Stamp when last processed
    pub stamp: Option<FileStamp>,
    /// Output path produced from this file (one-to-one stages)
    pub output: Option<PathBuf>,
    /// Content marker (aggregating stages)
    pub marker: Option<String>,
}

impl FileRecord {
    pub fn new(path: PathBuf, stamp: Option<FileStamp>) -> Self {
        Self {
            path,
            stamp,
            output: None,
            marker: None,
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }
}

/// All incremental state owned by one stage
#[derive(Debug, Default)]
pub struct StageCache {
    pub filter: IncrementalFilter,
    pub aggregate: AggregationCache,
}

impl StageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; the next run is a full rebuild
    pub fn reset(&mut self) {
        self.filter.clear();
        self.aggregate.clear();
    }
}
