// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Watch command - re-run stages on source changes

use colored::Colorize;
use miette::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::load_pipeline;
use crate::pipeline::{BuildMode, Orchestrator};

/// Run the watch command
pub async fn run(config: &Path, mode: BuildMode) -> Result<()> {
    let pipeline = load_pipeline(config, mode)?;
    let debounce = Duration::from_millis(pipeline.watch.debounce_ms);

    println!("{}", "Starting watch mode...".bold());
    println!("Debounce: {}ms, mode: {}", debounce.as_millis(), mode);

    let orchestrator = Arc::new(Orchestrator::new(pipeline)?);
    crate::watch::run(orchestrator, debounce).await?;
    Ok(())
}
