// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline definitions and execution
//!
//! The path table becomes an immutable [`Pipeline`] of [`Stage`]s; the
//! [`Orchestrator`] runs them in dependency order and keeps their caches.

mod dag;
mod definition;
mod executor;
pub mod run_state;
pub mod runner;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use executor::{Orchestrator, PipelineResult, StageOutcome};
pub use run_state::{RunState, StageSlot};
pub use runner::{run_stage, RunResult, StageReport};
pub use validation::{PipelineValidator, ValidationResult};
