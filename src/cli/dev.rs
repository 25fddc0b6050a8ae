// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Default command - build, then watch and serve together
//!
//! Stage failures in the initial build are reported but do not stop the
//! session; fixing the file triggers the stage again.

use colored::Colorize;
use miette::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::load_pipeline;
use crate::pipeline::{BuildMode, Orchestrator};
use crate::server::DevServer;

pub async fn run(config: &Path, mode: BuildMode) -> Result<()> {
    let pipeline = load_pipeline(config, mode)?;
    let debounce = Duration::from_millis(pipeline.watch.debounce_ms);
    let server = DevServer::new(&pipeline.base_dir, &pipeline.server).with_debounce(debounce);

    let orchestrator = Arc::new(Orchestrator::new(pipeline)?);
    let result = orchestrator.build().await?;
    if !result.success {
        println!(
            "{}",
            "Initial build had failures; watching for fixes.".yellow()
        );
    }

    tokio::try_join!(
        crate::watch::run(Arc::clone(&orchestrator), debounce),
        server.run(),
    )?;
    Ok(())
}
