// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Serve command - dev server over the destination tree

use miette::Result;
use std::path::Path;
use std::time::Duration;

use super::load_pipeline;
use crate::pipeline::BuildMode;
use crate::server::DevServer;

pub async fn run(config: &Path, mode: BuildMode) -> Result<()> {
    let pipeline = load_pipeline(config, mode)?;
    DevServer::new(&pipeline.base_dir, &pipeline.server)
        .with_debounce(Duration::from_millis(pipeline.watch.debounce_ms))
        .run()
        .await?;
    Ok(())
}
