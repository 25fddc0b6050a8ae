// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! assetflow - incremental static-site asset pipeline

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetflow::cli::{Cli, Commands};
use assetflow::pipeline::BuildMode;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "assetflow=debug"
    } else {
        "assetflow=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let mode = BuildMode::from_env();
    let config = cli.config.as_path();

    match cli.command.unwrap_or(Commands::Default) {
        Commands::Clean => assetflow::cli::clean::run(config, mode).await,
        Commands::Build => assetflow::cli::build::run(config, mode, cli.verbose).await,
        Commands::Watch => assetflow::cli::watch::run(config, mode).await,
        Commands::Serve => assetflow::cli::serve::run(config, mode).await,
        Commands::Default => assetflow::cli::dev::run(config, mode).await,
        Commands::Graph { format } => assetflow::cli::graph::run(config, mode, format).await,
        Commands::Validate => assetflow::cli::validate::run(config, mode, cli.verbose).await,
    }
}
