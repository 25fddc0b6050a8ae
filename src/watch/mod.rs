// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Watch trigger
//!
//! Subscribes each stage to its source and dependency globs and re-runs the
//! stage when a matching file changes. Events are debounced, and changes
//! that arrive while a stage is running coalesce into its next run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use glob::{MatchOptions, Pattern};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{Orchestrator, Pipeline};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One stage's interest in the source tree
#[derive(Debug, Clone)]
struct Subscription {
    stage: String,
    root: PathBuf,
    patterns: Vec<Pattern>,
    /// Destination nested under `root`; the stage's own writes
    ignored: Option<PathBuf>,
}

impl Subscription {
    fn matches(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        if self.ignored.as_ref().is_some_and(|dest| path.starts_with(dest)) {
            return false;
        }
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(rel, MATCH_OPTIONS))
    }
}

/// Maps changed paths to the stages that must re-run
#[derive(Debug, Clone, Default)]
pub struct WatchTrigger {
    subscriptions: Vec<Subscription>,
}

impl WatchTrigger {
    pub fn from_pipeline(pipeline: &Pipeline) -> AssetflowResult<Self> {
        let mut subscriptions = Vec::new();
        for stage in &pipeline.stages {
            let patterns = stage
                .watch_patterns()
                .into_iter()
                .map(Pattern::new)
                .collect::<Result<Vec<_>, _>>()?;

            // Event paths are absolute and canonical
            let root = stage.src.canonicalize().unwrap_or_else(|_| stage.src.clone());
            let ignored = stage
                .dest
                .strip_prefix(&stage.src)
                .ok()
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(|rel| root.join(rel));
            subscriptions.push(Subscription {
                stage: stage.name.clone(),
                root,
                patterns,
                ignored,
            });
        }
        Ok(Self { subscriptions })
    }

    /// Stages whose patterns match `path`
    pub fn stages_for(&self, path: &Path) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|s| s.matches(path))
            .map(|s| s.stage.clone())
            .collect()
    }

    /// Directories to watch, with nested roots collapsed into their parent
    pub fn roots(&self) -> Vec<PathBuf> {
        let all: BTreeSet<&PathBuf> = self.subscriptions.iter().map(|s| &s.root).collect();
        all.iter()
            .filter(|root| !all.iter().any(|other| other != *root && root.starts_with(other)))
            .map(|root| (*root).clone())
            .collect()
    }
}

/// Watch the source tree until Ctrl+C, re-running affected stages
pub async fn run(orchestrator: Arc<Orchestrator>, debounce: Duration) -> AssetflowResult<()> {
    let trigger = WatchTrigger::from_pipeline(orchestrator.pipeline())?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let mut debouncer = new_debouncer(debounce, move |result| {
        let _ = tx.send(result);
    })?;

    let mut watched = 0;
    for root in trigger.roots() {
        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "source directory missing, not watched");
            continue;
        }
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(path = %root.display(), "watching");
        watched += 1;
    }
    if watched == 0 {
        return Err(AssetflowError::Watch {
            message: "no source directory exists to watch".into(),
        });
    }

    println!("{}", "Watching for changes".bold());
    println!("Press {} to exit.", "Ctrl+C".cyan());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "Stopped watching".dimmed());
                return Ok(());
            }
            received = rx.recv() => {
                let Some(result) = received else {
                    return Err(AssetflowError::Watch {
                        message: "watcher channel closed".into(),
                    });
                };

                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!("watch error: {:?}", e);
                        continue;
                    }
                };

                let stages: BTreeSet<String> = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous))
                    .flat_map(|e| {
                        tracing::debug!(path = %e.path.display(), "changed");
                        trigger.stages_for(&e.path)
                    })
                    .collect();

                for stage in stages {
                    println!("{} {}", "Change detected:".yellow(), stage.bold());
                    let orchestrator = Arc::clone(&orchestrator);
                    tokio::spawn(async move {
                        if let Err(e) = orchestrator.trigger(&stage).await {
                            tracing::error!(stage = %stage, "{}", e);
                        }
                    });
                }
            }
        }
    }
}
