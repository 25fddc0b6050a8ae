// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! # assetflow - incremental static-site asset pipeline
//!
//! `assetflow` turns a source tree of templates, stylesheets, scripts,
//! images, fonts and icons into a publishable destination tree.
//!
//! ## Features
//!
//! - **Stage graph** - stages run in dependency order, independent ones concurrently
//! - **Incremental** - only sources newer than their outputs are reprocessed
//! - **Aggregation cache** - concatenated outputs re-transform only changed parts
//! - **Watch mode** - changes re-run exactly the stages that read them
//! - **Dev server** - serves the output tree with live reload
//!
//! ## Quick Start
//!
//! ```bash
//! # One-shot build
//! assetflow build
//!
//! # Build, then watch and serve
//! assetflow
//!
//! # Production build
//! ASSETFLOW_ENV=production assetflow build
//! ```

pub mod cache;
pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod server;
pub mod transforms;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use errors::{AssetflowError, AssetflowResult, TransformError};
pub use pipeline::{BuildMode, Orchestrator, Pipeline, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
