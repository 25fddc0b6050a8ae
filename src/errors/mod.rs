// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Error types
//!
//! Configuration errors are fatal and surface before any stage runs.
//! Transform errors are scoped to a single stage run and carry the stage
//! label and the failing source path so the operator can find the file.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for assetflow operations
pub type AssetflowResult<T> = Result<T, AssetflowError>;

/// A single file failing its stage's transform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{stage}] {}: {message}", .path.display())]
pub struct TransformError {
    /// Stage label
    pub stage: String,
    /// Source file that failed
    pub path: PathBuf,
    /// Collaborator message
    pub message: String,
}

impl TransformError {
    pub fn new(stage: &str, path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self {
            stage: stage.to_string(),
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Main error type for assetflow
#[derive(Error, Debug, Diagnostic)]
pub enum AssetflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(assetflow::config_not_found),
        help("Create an assetflow.yaml path table or pass --config <FILE>")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(assetflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Circular dependency detected: {}", .stages.join(" → "))]
    #[diagnostic(
        code(assetflow::circular_dependency),
        help("Review the depends_on entries in your path table to remove the cycle")
    )]
    CircularDependency { stages: Vec<String> },

    #[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
    #[diagnostic(
        code(assetflow::unknown_dependency),
        help("Check that '{dependency}' is defined in your path table")
    )]
    UnknownDependency { stage: String, dependency: String },

    #[error("Stage '{stage}' not found in pipeline")]
    #[diagnostic(code(assetflow::stage_not_found))]
    StageNotFound { stage: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(assetflow::glob_error))]
    GlobPattern { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(assetflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(assetflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(assetflow::toml_error))]
    Toml { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Transform Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Transform failed: {0}")]
    #[diagnostic(code(assetflow::transform_failed))]
    Transform(#[from] TransformError),

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("File watcher error: {message}")]
    #[diagnostic(code(assetflow::watch_error))]
    Watch { message: String },

    #[error("Dev server error: {message}")]
    #[diagnostic(code(assetflow::server_error))]
    Server { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(assetflow::io_error))]
    Io { message: String },
}

impl From<std::io::Error> for AssetflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for AssetflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for AssetflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for AssetflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for AssetflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl From<notify::Error> for AssetflowError {
    fn from(e: notify::Error) -> Self {
        Self::Watch { message: e.to_string() }
    }
}

impl AssetflowError {
    /// Whether this error must abort the process before any stage runs
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::InvalidConfig { .. }
                | Self::CircularDependency { .. }
                | Self::UnknownDependency { .. }
                | Self::StageNotFound { .. }
                | Self::GlobPattern { .. }
                | Self::Yaml { .. }
                | Self::Json { .. }
                | Self::Toml { .. }
        )
    }

    /// Create an invalid configuration error with a hint
    pub fn invalid_config(reason: impl Into<String>, help: Option<&str>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
            help: help.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_names_stage_and_path() {
        let err = TransformError::new("html", "src/templates/index.html", "unexpected end");
        let msg = err.to_string();
        assert!(msg.contains("[html]"));
        assert!(msg.contains("index.html"));
        assert!(msg.contains("unexpected end"));
    }

    #[test]
    fn test_configuration_classification() {
        let cfg = AssetflowError::ConfigNotFound { path: "x.yaml".into() };
        assert!(cfg.is_configuration());

        let tx: AssetflowError = TransformError::new("css", "a.scss", "bad").into();
        assert!(!tx.is_configuration());
    }

    #[test]
    fn test_cycle_message_lists_stages() {
        let err = AssetflowError::CircularDependency {
            stages: vec!["css".into(), "js".into(), "css".into()],
        };
        assert!(err.to_string().contains("css → js → css"));
    }
}
