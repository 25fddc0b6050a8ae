// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Graph command - visualize the stage graph

use miette::Result;
use std::path::Path;

use super::{load_pipeline, GraphFormat};
use crate::pipeline::{BuildMode, DagBuilder};

/// Run the graph command
pub async fn run(config: &Path, mode: BuildMode, format: GraphFormat) -> Result<()> {
    let pipeline = load_pipeline(config, mode)?;
    let dag = DagBuilder::build(&pipeline)?;

    let output = match format {
        GraphFormat::Text => dag.to_text(&pipeline)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
