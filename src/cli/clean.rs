// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Clean command - purge the destination root

use miette::Result;
use std::path::Path;

use super::load_pipeline;
use crate::pipeline::{BuildMode, Orchestrator};

pub async fn run(config: &Path, mode: BuildMode) -> Result<()> {
    let pipeline = load_pipeline(config, mode)?;
    let orchestrator = Orchestrator::new(pipeline)?;
    orchestrator.clean().await?;
    Ok(())
}
