// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Validate command - check the path table

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::pipeline::{BuildMode, Pipeline, PipelineValidator};

/// Run the validate command
pub async fn run(config: &Path, mode: BuildMode, verbose: bool) -> Result<()> {
    println!("{}", "Validating path table...".bold());
    println!();

    let pipeline = match Pipeline::load(config, mode) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to load {}", "✗".red(), config.display());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} {} parsed", "✓".green(), config.display());

    let validation = PipelineValidator::validate(&pipeline)?;
    let missing_sources = PipelineValidator::validate_files(&pipeline);

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !missing_sources.is_empty() {
        println!();
        println!("{}:", "Missing sources".yellow().bold());
        for missing in &missing_sources {
            println!("  {} {}", "⚠".yellow(), missing);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Stages".bold());
        for stage in &pipeline.stages {
            let deps = if stage.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", stage.depends_on.join(", "))
            };
            println!(
                "    - {} ({}) {} → {}{}",
                stage.name,
                stage.step_summary(),
                stage.src.display(),
                stage.dest.display(),
                deps.dimmed()
            );
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Path table validation failed"));
    }

    if validation.has_warnings() || !missing_sources.is_empty() {
        println!("{}", "Path table is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Path table is valid!".green().bold());
    }
    Ok(())
}
