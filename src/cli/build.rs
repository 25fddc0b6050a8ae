// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Build command - clean, then run every stage once

use miette::Result;
use std::path::Path;

use super::load_pipeline;
use crate::pipeline::{BuildMode, Orchestrator};

pub async fn run(config: &Path, mode: BuildMode, verbose: bool) -> Result<()> {
    let pipeline = load_pipeline(config, mode)?;
    let orchestrator = Orchestrator::new(pipeline)?;
    let result = orchestrator.build().await?;

    if verbose {
        for (stage, outcome) in &result.outcomes {
            tracing::info!(stage = %stage, "{:?}", outcome);
        }
    }

    let failures = result.failures();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(miette::miette!(
            "{} stage{} failed",
            failures.len(),
            if failures.len() == 1 { "" } else { "s" }
        ))
    }
}
