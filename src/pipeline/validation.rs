// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline validation
//!
//! Validates the stage graph before anything runs.

use std::collections::HashSet;

use crate::errors::AssetflowError;
use crate::pipeline::{DagBuilder, Pipeline, Stage};
use crate::transforms::{ContentType, StagePlan};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(pipeline: &Pipeline) -> Result<ValidationResult, AssetflowError> {
        let mut result = ValidationResult::new();

        if pipeline.stages.is_empty() {
            result.add_error("Pipeline has no stages defined");
        }

        let mut seen_names = HashSet::new();
        for stage in &pipeline.stages {
            if !seen_names.insert(&stage.name) {
                result.add_error(&format!("Duplicate stage name: '{}'", stage.name));
            }
        }

        // Cycles and unknown dependencies
        let dag = match DagBuilder::build(pipeline) {
            Ok(dag) => Some(dag),
            Err(AssetflowError::CircularDependency { stages }) => {
                result.add_error(&format!("Circular dependency: {}", stages.join(" → ")));
                None
            }
            Err(AssetflowError::UnknownDependency { stage, dependency }) => {
                result.add_error(&format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    stage, dependency
                ));
                None
            }
            Err(e) => {
                result.add_error(&format!("DAG validation error: {}", e));
                None
            }
        };

        for stage in &pipeline.stages {
            Self::validate_stage(stage, &mut result);

            if !stage.dest.starts_with(&pipeline.base_dir) {
                result.add_warning(&format!(
                    "Stage '{}': destination {} is outside {} and survives `clean`",
                    stage.name,
                    stage.dest.display(),
                    pipeline.base_dir.display()
                ));
            }
        }

        if let Some(dag) = dag {
            Self::validate_ordering(pipeline, &dag, &mut result);
        }

        Ok(result)
    }

    /// Validate a single stage
    fn validate_stage(stage: &Stage, result: &mut ValidationResult) {
        if stage.patterns.is_empty() {
            result.add_error(&format!("Stage '{}': no glob patterns", stage.name));
        }
        for pattern in stage.glob_patterns().into_iter().chain(stage.watch_glob_patterns()) {
            if let Err(e) = glob::Pattern::new(&pattern) {
                result.add_error(&format!(
                    "Stage '{}': invalid glob pattern '{}': {}",
                    stage.name, pattern, e
                ));
            }
        }

        if stage.steps.is_empty() {
            result.add_error(&format!("Stage '{}': no transform steps", stage.name));
            return;
        }

        let aggregates = stage.steps.iter().filter(|s| s.is_aggregate()).count();
        if aggregates > 1 {
            result.add_error(&format!(
                "Stage '{}': only one aggregate step is allowed, found {}",
                stage.name, aggregates
            ));
        } else if aggregates == 1 && !stage.is_aggregating() {
            result.add_error(&format!(
                "Stage '{}': aggregate step must be the last step",
                stage.name
            ));
        }

        for output in stage.steps.iter().filter_map(|s| s.aggregate_output()) {
            if output.is_empty() || output.contains('/') || output.contains('\\') {
                result.add_error(&format!(
                    "Stage '{}': output name '{}' must be a plain file name",
                    stage.name, output
                ));
            }
        }

        // Each step must accept what the previous one produces
        let mut current = ContentType::Any;
        for (tag, input, output) in StagePlan::for_stage(stage).contracts() {
            if !current.feeds(input) {
                result.add_error(&format!(
                    "Stage '{}': step '{}' expects {} input but receives {}",
                    stage.name, tag, input, current
                ));
            }
            if output != ContentType::Any {
                current = output;
            }
        }
    }

    /// A stage reading another stage's output must run after it
    fn validate_ordering(pipeline: &Pipeline, dag: &DagBuilder, result: &mut ValidationResult) {
        for reader in &pipeline.stages {
            for writer in &pipeline.stages {
                if reader.name == writer.name || !reader.src.starts_with(&writer.dest) {
                    continue;
                }
                if !dag.depends_on(&reader.name, &writer.name) {
                    result.add_error(&format!(
                        "Stage '{}' reads from the destination of '{}' but does not depend on it",
                        reader.name, writer.name
                    ));
                }
            }
        }
    }

    /// Source directories that do not exist (runtime validation)
    pub fn validate_files(pipeline: &Pipeline) -> Vec<String> {
        pipeline
            .stages
            .iter()
            .filter(|stage| !stage.src.is_dir())
            .map(|stage| {
                format!(
                    "Stage '{}': source directory not found: {}",
                    stage.name,
                    stage.src.display()
                )
            })
            .collect()
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BuildMode, TransformStep};

    fn stage(name: &str, steps: Vec<TransformStep>) -> Stage {
        Stage::new(
            name,
            format!("/site/src/{}", name),
            vec!["**/*".into()],
            format!("/site/dist/{}", name),
            steps,
        )
    }

    fn pipeline(stages: Vec<Stage>) -> Pipeline {
        Pipeline::new("/site/dist", BuildMode::Production, stages)
    }

    #[test]
    fn test_validate_empty_pipeline() {
        let result = PipelineValidator::validate(&pipeline(vec![])).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no stages"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result = PipelineValidator::validate(&pipeline(vec![
            stage("css", vec![TransformStep::RawCopy]),
            stage("css", vec![TransformStep::RawCopy]),
        ]))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_aggregate_must_be_last() {
        let result = PipelineValidator::validate(&pipeline(vec![stage(
            "js",
            vec![
                TransformStep::Concat {
                    output: "all.js".into(),
                },
                TransformStep::RawCopy,
            ],
        )]))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("last step")));
    }

    #[test]
    fn test_content_type_mismatch() {
        let result = PipelineValidator::validate(&pipeline(vec![stage(
            "html",
            vec![TransformStep::TemplateRender, TransformStep::StyleCompile],
        )]))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("expects stylesheet")));
    }

    #[test]
    fn test_invalid_watch_glob() {
        let result = PipelineValidator::validate(&pipeline(vec![
            stage("html", vec![TransformStep::TemplateRender]).with_watch(&["parts/[*.html"]),
        ]))
        .unwrap();

        assert!(result.errors.iter().any(|e| e.contains("invalid glob pattern")));
    }

    #[test]
    fn test_default_like_stages_are_valid() {
        let result = PipelineValidator::validate(&pipeline(vec![
            stage("img", vec![TransformStep::ImageOptimize { level: 1 }]),
            stage(
                "css",
                vec![
                    TransformStep::StyleCompile,
                    TransformStep::Concat {
                        output: "custom.min.css".into(),
                    },
                ],
            )
            .with_depends_on(&["img"]),
        ]))
        .unwrap();

        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_reading_other_output_requires_dependency() {
        let mut reader = stage("css", vec![TransformStep::RawCopy]);
        reader.src = "/site/dist/img/generated".into();

        let result = PipelineValidator::validate(&pipeline(vec![
            stage("img", vec![TransformStep::RawCopy]),
            reader.clone(),
        ]))
        .unwrap();
        assert!(result.errors.iter().any(|e| e.contains("does not depend")));

        let result = PipelineValidator::validate(&pipeline(vec![
            stage("img", vec![TransformStep::RawCopy]),
            reader.with_depends_on(&["img"]),
        ]))
        .unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_destination_outside_base_dir_warns() {
        let mut s = stage("fonts", vec![TransformStep::RawCopy]);
        s.dest = "/elsewhere/fonts".into();

        let result = PipelineValidator::validate(&pipeline(vec![s])).unwrap();
        assert!(result.is_valid());
        assert!(result.has_warnings());
    }
}
