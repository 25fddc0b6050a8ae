// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for assetflow.

pub mod build;
pub mod clean;
pub mod dev;
pub mod graph;
pub mod serve;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::pipeline::{BuildMode, Pipeline};

/// Incremental static-site asset pipeline
///
/// Compiles templates, stylesheets, scripts, images and icons from the
/// source tree into a publishable destination tree.
#[derive(Parser, Debug)]
#[clap(
    name = "assetflow",
    version,
    about = "Incremental static-site asset pipeline with live reload",
    long_about = None,
    after_help = "Examples:\n\
        assetflow build                 Clean and build every stage\n\
        assetflow watch                 Rebuild stages when their sources change\n\
        assetflow                       Build, then watch and serve with live reload\n\n\
        The build mode is read from ASSETFLOW_ENV (or NODE_ENV); anything other\n\
        than 'development' or an empty value builds for production."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Path table
    #[clap(
        short,
        long,
        global = true,
        env = "ASSETFLOW_CONFIG",
        default_value = "assetflow.yaml"
    )]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Commands {
    /// Remove everything under the destination root
    Clean,

    /// Clean, then run every stage once in dependency order
    Build,

    /// Re-run stages when their sources change (no initial build)
    Watch,

    /// Serve the destination tree with live reload
    Serve,

    /// Build, then watch and serve (the default)
    Default,

    /// Show the stage graph
    Graph {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Validate the path table
    Validate,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Load the path table; configuration errors surface as diagnostics
pub fn load_pipeline(config: &Path, mode: BuildMode) -> Result<Pipeline> {
    let pipeline = Pipeline::load(config, mode)?;
    tracing::debug!(
        config = %config.display(),
        stages = pipeline.stages.len(),
        mode = %mode,
        "loaded path table"
    );
    Ok(pipeline)
}
