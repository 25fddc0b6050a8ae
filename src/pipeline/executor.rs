// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline orchestrator
//!
//! Runs stages in dependency order, independent stages concurrently. A
//! failing stage is reported and blocks only the stages downstream of it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tokio::task::JoinSet;

use crate::errors::{AssetflowError, AssetflowResult, TransformError};
use crate::pipeline::run_state::{RunState, StageSlot};
use crate::pipeline::runner::{run_stage, RunResult, StageReport};
use crate::pipeline::{DagBuilder, Pipeline, PipelineValidator};
use crate::transforms::TransformContext;
use crate::utils::create_spinner;

/// How one stage ended within a pipeline run
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Completed(StageReport),
    Superseded,
    Failed(TransformError),
    /// Not run because an upstream stage failed
    Skipped { blocked_by: String },
}

impl StageOutcome {
    /// Whether dependents may run
    pub fn unblocks(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Superseded)
    }
}

/// Result of running the pipeline
#[derive(Debug)]
pub struct PipelineResult {
    /// Outcome for each stage
    pub outcomes: BTreeMap<String, StageOutcome>,
    /// Total execution time
    pub duration: Duration,
    /// Whether all stages succeeded
    pub success: bool,
}

impl PipelineResult {
    pub fn failures(&self) -> Vec<&TransformError> {
        self.outcomes
            .values()
            .filter_map(|o| match o {
                StageOutcome::Failed(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

/// Owns the stage graph and the per-stage caches for the life of the process
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    dag: DagBuilder,
    slots: HashMap<String, Arc<StageSlot>>,
}

impl Orchestrator {
    /// Build the orchestrator; fails on cycles, unknown dependencies and
    /// any other validation error
    pub fn new(pipeline: Pipeline) -> AssetflowResult<Self> {
        let dag = DagBuilder::build(&pipeline)?;

        let validation = PipelineValidator::validate(&pipeline)?;
        for warning in &validation.warnings {
            tracing::warn!("{}", warning);
        }
        if !validation.is_valid() {
            return Err(AssetflowError::invalid_config(
                validation.errors.join("; "),
                Some("run `assetflow validate` for details"),
            ));
        }

        let slots = pipeline
            .stages
            .iter()
            .map(|stage| (stage.name.clone(), Arc::new(StageSlot::new(stage.clone()))))
            .collect();

        Ok(Self {
            pipeline: Arc::new(pipeline),
            dag,
            slots,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn state_of(&self, stage: &str) -> Option<RunState> {
        self.slots.get(stage).map(|slot| slot.state())
    }

    /// Remove everything under the destination root and reset every cache
    pub async fn clean(&self) -> AssetflowResult<()> {
        let base_dir = &self.pipeline.base_dir;
        let spinner = create_spinner(&format!("Cleaning {}", base_dir.display()));

        // Stage runs hold their cache lock; taking all of them (in a fixed
        // order) waits for in-flight runs.
        let mut names: Vec<&String> = self.slots.keys().collect();
        names.sort();
        let mut guards = Vec::with_capacity(names.len());
        for name in names {
            guards.push(self.slots[name].cache.lock().await);
        }

        let result = Self::purge(base_dir).await;
        for guard in guards.iter_mut() {
            guard.reset();
        }
        drop(guards);

        spinner.finish_and_clear();
        result?;

        println!("  {} {}", "✓".green(), format!("cleaned {}", base_dir.display()).dimmed());
        Ok(())
    }

    async fn purge(base_dir: &std::path::Path) -> AssetflowResult<()> {
        let mut entries = match tokio::fs::read_dir(base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let removed = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            removed.map_err(|e| AssetflowError::FileWriteError {
                path: path.clone(),
                error: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// `clean` followed by a full run
    pub async fn build(&self) -> AssetflowResult<PipelineResult> {
        self.clean().await?;
        Ok(self.run_all().await)
    }

    /// Run every stage, respecting dependencies
    pub async fn run_all(&self) -> PipelineResult {
        let start = Instant::now();
        println!();
        println!("{} ({})", "Building assets".bold(), self.pipeline.mode);

        let mut outcomes: BTreeMap<String, StageOutcome> = BTreeMap::new();
        let mut started: HashSet<String> = HashSet::new();
        let mut running = JoinSet::new();
        let order = self.dag.topological_order_names().unwrap_or_default();

        loop {
            for name in &order {
                if started.contains(name) {
                    continue;
                }
                let deps = self.dag.dependencies(name).unwrap_or_default();
                if !deps.iter().all(|d| outcomes.contains_key(d)) {
                    continue;
                }

                started.insert(name.clone());
                if let Some(blocker) = deps.iter().find(|d| !outcomes[*d].unblocks()) {
                    let outcome = StageOutcome::Skipped {
                        blocked_by: blocker.clone(),
                    };
                    Self::print_outcome(name, &outcome);
                    outcomes.insert(name.clone(), outcome);
                    continue;
                }

                let name = name.clone();
                let run = self.spawn_stage(&name);
                running.spawn(async move { (name, run.await) });
            }

            // Skipped stages may have unblocked more skips without any task
            // finishing, so loop until nothing new can start.
            if running.is_empty() {
                if started.len() == order.len() {
                    break;
                }
                if order.iter().all(|n| started.contains(n) || !self.ready(n, &outcomes)) {
                    break;
                }
                continue;
            }

            if let Some(Ok((name, outcome))) = running.join_next().await {
                Self::print_outcome(&name, &outcome);
                outcomes.insert(name, outcome);
            }
        }

        let duration = start.elapsed();
        let success = outcomes.values().all(StageOutcome::unblocks);

        println!();
        if success {
            println!(
                "{}",
                format!("Assets built in {:.2}s", duration.as_secs_f64()).green()
            );
        } else {
            println!(
                "{}",
                format!("Build finished with errors after {:.2}s", duration.as_secs_f64()).red()
            );
        }

        PipelineResult {
            outcomes,
            duration,
            success,
        }
    }

    fn ready(&self, name: &str, outcomes: &BTreeMap<String, StageOutcome>) -> bool {
        self.dag
            .dependencies(name)
            .unwrap_or_default()
            .iter()
            .all(|d| outcomes.contains_key(d))
    }

    /// Re-run one stage in response to a change; transform errors are
    /// reported and never propagate
    pub async fn trigger(&self, stage: &str) -> AssetflowResult<StageOutcome> {
        if !self.slots.contains_key(stage) {
            return Err(AssetflowError::StageNotFound {
                stage: stage.to_string(),
            });
        }

        let outcome = self.spawn_stage(stage).await;
        Self::print_outcome(stage, &outcome);
        Ok(outcome)
    }

    /// Run a stage on its own task so a panicking transform is contained
    fn spawn_stage(&self, name: &str) -> impl std::future::Future<Output = StageOutcome> {
        let slot = self.slots.get(name).cloned();
        let mode = self.pipeline.mode;
        let name = name.to_string();

        async move {
            let Some(slot) = slot else {
                return StageOutcome::Failed(TransformError::new(&name, "", "unknown stage"));
            };
            let generation = slot.request();
            let task_slot = Arc::clone(&slot);

            let handle = tokio::spawn(async move { Self::execute(task_slot, generation, mode).await });
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    slot.transition(RunState::Failed);
                    StageOutcome::Failed(TransformError::new(
                        &name,
                        &slot.stage.src,
                        format!("stage task aborted: {}", e),
                    ))
                }
            }
        }
    }

    async fn execute(slot: Arc<StageSlot>, generation: u64, mode: crate::pipeline::BuildMode) -> StageOutcome {
        let mut cache = slot.cache.lock().await;
        if !slot.is_latest(generation) {
            return StageOutcome::Superseded;
        }

        slot.transition(RunState::Running);
        tracing::info!(stage = %slot.stage.name, generation, "stage started");
        let ctx = TransformContext::new(&slot.stage, mode);
        let is_current = || slot.is_latest(generation);

        match run_stage(&slot.stage, &ctx, &mut cache, &is_current).await {
            Ok(RunResult::Completed(report)) => {
                slot.transition(RunState::Completed);
                tracing::info!(
                    stage = %slot.stage.name,
                    transformed = report.transformed,
                    reused = report.reused,
                    removed = report.removed,
                    "stage finished"
                );
                StageOutcome::Completed(report)
            }
            Ok(RunResult::Superseded) => {
                slot.transition(RunState::Superseded);
                StageOutcome::Superseded
            }
            Err(e) => {
                slot.transition(RunState::Failed);
                StageOutcome::Failed(e)
            }
        }
    }

    fn print_outcome(name: &str, outcome: &StageOutcome) {
        match outcome {
            StageOutcome::Completed(report) if report.is_up_to_date() => {
                println!("  {} {} {}", "✓".green(), name.bold(), "(up to date)".dimmed());
            }
            StageOutcome::Completed(report) => {
                println!(
                    "  {} {} ({} transformed, {} reused, {:.2}s)",
                    "✓".green(),
                    name.bold(),
                    report.transformed,
                    report.reused,
                    report.duration.as_secs_f64()
                );
            }
            StageOutcome::Superseded => {
                tracing::debug!(stage = name, "run superseded by a newer change");
            }
            StageOutcome::Failed(e) => {
                tracing::error!(stage = name, file = %e.path.display(), "{}", e.message);
                eprintln!("  {} {}", "✗".red(), e.to_string().red());
            }
            StageOutcome::Skipped { blocked_by } => {
                println!(
                    "  {} {} {}",
                    "○".dimmed(),
                    name.dimmed(),
                    format!("(skipped, '{}' failed)", blocked_by).dimmed()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BuildMode, Stage, TransformStep};
    use std::fs;

    fn copy_stage(root: &std::path::Path, name: &str) -> Stage {
        fs::create_dir_all(root.join("src").join(name)).unwrap();
        Stage::new(
            name,
            root.join("src").join(name),
            vec!["*".into()],
            root.join("dist").join(name),
            vec![TransformStep::RawCopy],
        )
    }

    #[tokio::test]
    async fn test_failure_skips_dependents_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let fonts = copy_stage(root, "fonts");
        let mut css = copy_stage(root, "css");
        css.steps = vec![TransformStep::StyleCompile];
        let html = copy_stage(root, "html").with_depends_on(&["css"]);

        fs::write(root.join("src/fonts/a.woff"), "font").unwrap();
        fs::write(root.join("src/css/bad.scss"), ".a {").unwrap();
        fs::write(root.join("src/html/index.html"), "<p></p>").unwrap();

        let pipeline = Pipeline::new(root.join("dist"), BuildMode::Production, vec![fonts, css, html]);
        let orchestrator = Orchestrator::new(pipeline).unwrap();
        let result = orchestrator.run_all().await;

        assert!(!result.success);
        assert!(matches!(result.outcomes["fonts"], StageOutcome::Completed(_)));
        assert!(matches!(result.outcomes["css"], StageOutcome::Failed(_)));
        assert!(matches!(
            &result.outcomes["html"],
            StageOutcome::Skipped { blocked_by } if blocked_by == "css"
        ));
        assert!(root.join("dist/fonts/a.woff").exists());
        assert_eq!(orchestrator.state_of("css"), Some(RunState::Failed));
    }

    #[tokio::test]
    async fn test_clean_empties_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let fonts = copy_stage(root, "fonts");
        fs::write(root.join("src/fonts/a.woff"), "font").unwrap();
        fs::create_dir_all(root.join("dist/stale")).unwrap();
        fs::write(root.join("dist/stale/old.txt"), "old").unwrap();

        let pipeline = Pipeline::new(root.join("dist"), BuildMode::Production, vec![fonts]);
        let orchestrator = Orchestrator::new(pipeline).unwrap();
        let result = orchestrator.build().await.unwrap();

        assert!(result.success);
        assert!(!root.join("dist/stale").exists());
        assert!(root.join("dist/fonts/a.woff").exists());
    }

    #[test]
    fn test_invalid_pipeline_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut css = copy_stage(root, "css");
        css.steps = vec![
            TransformStep::Concat {
                output: "all.css".into(),
            },
            TransformStep::StyleCompile,
        ];

        let pipeline = Pipeline::new(root.join("dist"), BuildMode::Production, vec![css]);
        let err = Orchestrator::new(pipeline).err().unwrap();

        assert!(matches!(&err, AssetflowError::InvalidConfig { reason, .. } if reason.contains("last step")));
        assert!(!root.join("dist").exists());
    }

    #[tokio::test]
    async fn test_trigger_unknown_stage() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            dir.path().join("dist"),
            BuildMode::Production,
            vec![copy_stage(dir.path(), "fonts")],
        );
        let orchestrator = Orchestrator::new(pipeline).unwrap();

        assert!(matches!(
            orchestrator.trigger("nope").await,
            Err(AssetflowError::StageNotFound { .. })
        ));
    }
}
