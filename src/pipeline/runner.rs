// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Single stage run
//!
//! Resolves the stage's sources and dependencies, admits the files the
//! incremental filter considers stale, transforms them and writes the
//! outputs. Nothing is written and the cache is left untouched when a
//! transform fails or a newer trigger supersedes the run.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cache::{hash_bytes, incremental, FileRecord, FileStamp, StageCache};
use crate::errors::{AssetflowError, TransformError};
use crate::pipeline::Stage;
use crate::transforms::{
    relative_to_root, resolve_sources, resolve_watched, Asset, Combine, StagePlan, TransformContext,
};

/// What one completed run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    /// Sources matched by the stage's patterns
    pub scanned: usize,
    /// Files whose contents were read from disk
    pub read: usize,
    /// Sources that went through the transforms
    pub transformed: usize,
    /// Sources skipped as up to date
    pub reused: usize,
    /// Outputs removed because their source disappeared
    pub removed: usize,
    /// Files written, in write order
    pub written: Vec<PathBuf>,
    pub duration: Duration,
}

impl StageReport {
    fn new(stage: &Stage, scanned: usize) -> Self {
        Self {
            stage: stage.name.clone(),
            scanned,
            ..Self::default()
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.transformed == 0 && self.removed == 0 && self.written.is_empty()
    }
}

/// How a run ended when no transform failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Completed(StageReport),
    Superseded,
}

/// The files one run looks at, split by role
#[derive(Debug, Default)]
struct StageFiles {
    scanned: usize,
    /// Sources that produce output
    inputs: BTreeSet<PathBuf>,
    /// Partials and watched files the inputs may pull in
    dependencies: BTreeSet<PathBuf>,
    /// Every file the filter keeps a record of
    tracked: BTreeSet<PathBuf>,
}

impl StageFiles {
    fn resolve(stage: &Stage) -> Result<Self, AssetflowError> {
        let sources = resolve_sources(stage)?;
        let watched = resolve_watched(stage)?;
        let plan = StagePlan::for_stage(stage);

        let (mut dependencies, inputs): (BTreeSet<PathBuf>, BTreeSet<PathBuf>) = sources
            .iter()
            .cloned()
            .partition(|s| plan.is_partial(&relative_to_root(stage, s)));
        dependencies.extend(watched.difference(&sources).cloned());

        let mut tracked = inputs.clone();
        tracked.extend(dependencies.iter().cloned());

        Ok(Self {
            scanned: sources.len(),
            inputs,
            dependencies,
            tracked,
        })
    }
}

/// Run one stage against its cache.
///
/// `is_current` is polled before any write; once it returns false the run
/// ends as [`RunResult::Superseded`] without side effects.
pub async fn run_stage(
    stage: &Stage,
    ctx: &TransformContext,
    cache: &mut StageCache,
    is_current: &(dyn Fn() -> bool + Sync),
) -> Result<RunResult, TransformError> {
    let start = Instant::now();

    tokio::fs::create_dir_all(&stage.dest)
        .await
        .map_err(|e| ctx.error(&stage.dest, format!("cannot create destination: {}", e)))?;

    let files = {
        let resolved = stage.clone();
        tokio::task::spawn_blocking(move || StageFiles::resolve(&resolved))
            .await
            .map_err(|e| ctx.error(&stage.src, e))?
            .map_err(|e| ctx.error(&stage.src, e))?
    };

    let plan = StagePlan::for_stage(stage);
    let result = match &plan.combine {
        Some(combine) => {
            run_aggregating(stage, &plan, combine.as_ref(), ctx, cache, &files, is_current).await?
        }
        None => run_one_to_one(stage, &plan, ctx, cache, &files, is_current).await?,
    };

    Ok(match result {
        RunResult::Completed(mut report) => {
            report.duration = start.elapsed();
            RunResult::Completed(report)
        }
        superseded => superseded,
    })
}

async fn read_source(path: &Path, ctx: &TransformContext) -> Result<Vec<u8>, TransformError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ctx.error(path, format!("cannot read source: {}", e)))
}

fn stamps_of(files: &BTreeSet<PathBuf>) -> BTreeMap<PathBuf, Option<FileStamp>> {
    files.iter().map(|f| (f.clone(), FileStamp::of(f))).collect()
}

async fn run_aggregating(
    stage: &Stage,
    plan: &StagePlan,
    combine: &dyn Combine,
    ctx: &TransformContext,
    cache: &mut StageCache,
    files: &StageFiles,
    is_current: &(dyn Fn() -> bool + Sync),
) -> Result<RunResult, TransformError> {
    let mut report = StageReport::new(stage, files.scanned);
    let output_path = stage.dest.join(combine.output_name());
    let parts = &files.inputs;

    // Stat first: only files whose stamp moved are read and hashed
    let stamps = stamps_of(&files.tracked);
    let mut contents = BTreeMap::new();
    let mut markers = BTreeMap::new();
    for (file, stamp) in &stamps {
        let marker = match cache.filter.known_marker(file, *stamp) {
            Some(marker) => marker.to_string(),
            None => {
                let data = read_source(file, ctx).await?;
                report.read += 1;
                let marker = hash_bytes(&data);
                if parts.contains(file) {
                    contents.insert(file.clone(), data);
                }
                marker
            }
        };
        markers.insert(file.clone(), marker);
    }

    let gone = cache.filter.missing_from(&files.tracked);
    let dependency_changed = files
        .dependencies
        .iter()
        .any(|d| cache.filter.is_unseen(d, &markers[d]))
        || gone.iter().any(|r| !cache.aggregate.contains(&r.path));

    let admitted: Vec<&PathBuf> = parts
        .iter()
        .filter(|p| {
            dependency_changed || cache.filter.is_unseen(p, &markers[*p]) || !cache.aggregate.contains(p)
        })
        .collect();

    let output_exists = tokio::fs::try_exists(&output_path).await.unwrap_or(false);
    if admitted.is_empty() && gone.is_empty() && !dependency_changed && (output_exists || parts.is_empty()) {
        tracing::debug!(stage = %stage.name, "combined output up to date");
        report.reused = parts.len();
        return Ok(RunResult::Completed(report));
    }

    let mut fresh = BTreeMap::new();
    for source in &admitted {
        let rel = relative_to_root(stage, source);
        let data = match contents.remove(*source) {
            Some(data) => data,
            None => {
                report.read += 1;
                read_source(source, ctx).await?
            }
        };
        let asset = plan.apply(Asset::new(*source, rel, data), ctx).await?;
        fresh.insert((*source).clone(), asset.contents);
    }
    report.transformed = fresh.len();
    report.reused = parts.len() - fresh.len();

    if !is_current() {
        return Ok(RunResult::Superseded);
    }

    if parts.is_empty() {
        report.removed = remove_output(&output_path, ctx).await?;
    } else {
        let preview = cache.aggregate.preview(&fresh, parts);
        let outputs = combine.combine(&preview, ctx)?;
        for output in outputs {
            let path = stage.dest.join(&output.rel_path);
            write_atomic(&path, &output.contents, ctx).await?;
            report.written.push(path);
        }
    }

    let summary = cache.aggregate.commit(fresh, parts);
    report.removed += summary.removed;
    for record in &gone {
        cache.filter.forget(&record.path);
    }
    for (file, stamp) in stamps {
        let marker = markers.remove(&file).unwrap_or_default();
        cache.filter.record(FileRecord::new(file, stamp).with_marker(marker));
    }

    tracing::debug!(
        stage = %stage.name,
        updated = summary.updated,
        dropped = summary.removed,
        "aggregation cache committed"
    );
    Ok(RunResult::Completed(report))
}

async fn run_one_to_one(
    stage: &Stage,
    plan: &StagePlan,
    ctx: &TransformContext,
    cache: &mut StageCache,
    files: &StageFiles,
    is_current: &(dyn Fn() -> bool + Sync),
) -> Result<RunResult, TransformError> {
    let mut report = StageReport::new(stage, files.scanned);

    let stamps = stamps_of(&files.tracked);
    let gone = cache.filter.missing_from(&files.tracked);
    let dependency_changed = gone.iter().any(|r| r.output.is_none())
        || files
            .dependencies
            .iter()
            .any(|d| !cache.filter.is_unchanged(d, stamps[d]));

    let mut transformed = Vec::new();
    for source in &files.inputs {
        let rel = relative_to_root(stage, source);
        let output = stage.dest.join(plan.output_rel_path(&rel));

        let staleness = incremental::check(source, &output);
        if !staleness.is_stale() && !dependency_changed {
            report.reused += 1;
            continue;
        }

        tracing::debug!(
            stage = %stage.name,
            file = %source.display(),
            reason = ?staleness,
            dependency_changed,
            "admitted"
        );
        let data = read_source(source, ctx).await?;
        report.read += 1;
        let asset = plan.apply(Asset::new(source, rel, data), ctx).await?;
        transformed.push((output, asset));
    }
    report.transformed = transformed.len();

    if !is_current() {
        return Ok(RunResult::Superseded);
    }

    for (output, asset) in &transformed {
        write_atomic(output, &asset.contents, ctx).await?;
        report.written.push(output.clone());
    }

    for record in &gone {
        if let Some(output) = &record.output {
            report.removed += remove_output(output, ctx).await?;
        }
        cache.filter.forget(&record.path);
    }

    for (file, stamp) in stamps {
        let record = FileRecord::new(file.clone(), stamp);
        let record = if files.inputs.contains(&file) {
            let rel = relative_to_root(stage, &file);
            record.with_output(stage.dest.join(plan.output_rel_path(&rel)))
        } else {
            record
        };
        cache.filter.record(record);
    }

    Ok(RunResult::Completed(report))
}

/// Remove a stale output; a file that is already gone is not an error
async fn remove_output(path: &Path, ctx: &TransformContext) -> Result<usize, TransformError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(file = %path.display(), "removed output");
            Ok(1)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(ctx.error(path, format!("cannot remove output: {}", e))),
    }
}

/// Write through a temporary sibling and rename, so readers never see a
/// partially written file
pub(crate) async fn write_atomic(path: &Path, contents: &[u8], ctx: &TransformContext) -> Result<(), TransformError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ctx.error(path, format!("cannot create directory: {}", e)))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| ctx.error(path, format!("write failed: {}", e)))?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ctx.error(path, format!("write failed: {}", e)));
    }
    Ok(())
}
