// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Transform steps
//!
//! Each [`TransformStep`] of a stage maps to a [`Transform`] applied to
//! every admitted file, and aggregate steps additionally to a [`Combine`]
//! that folds the per-file results into the stage's single output.
//! The heavy lifting is delegated to library collaborators.

mod copy;
mod image;
mod script;
mod sourcemap;
mod sprite;
mod style;
mod template;

pub use copy::{Joiner, RawCopy};
pub use image::ImageOptimize;
pub use script::ScriptMinify;
pub use sourcemap::SourceMapBuilder;
pub use sprite::{SpriteSheet, SvgSymbol};
pub use style::StyleCompile;
pub use template::TemplateRender;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cache::Part;
use crate::errors::{AssetflowError, TransformError};
use crate::pipeline::{BuildMode, Stage, TransformStep};

/// Content-type contract of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Accepts anything / passes its input type through
    Any,
    Template,
    Html,
    Stylesheet,
    Css,
    Script,
    Image,
    Svg,
}

impl ContentType {
    /// Whether output of type `self` can feed a step expecting `input`
    pub fn feeds(&self, input: ContentType) -> bool {
        *self == ContentType::Any || input == ContentType::Any || *self == input
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Template => "template",
            Self::Html => "html",
            Self::Stylesheet => "stylesheet",
            Self::Css => "css",
            Self::Script => "script",
            Self::Image => "image",
            Self::Svg => "svg",
        };
        f.write_str(name)
    }
}

/// A file travelling through a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Source file this asset was read from
    pub source: PathBuf,
    /// Output path relative to the stage destination
    pub rel_path: PathBuf,
    /// Current contents
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(source: impl Into<PathBuf>, rel_path: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            rel_path: rel_path.into(),
            contents,
        }
    }

    /// Contents as UTF-8, or a transform error naming the file
    pub fn text(&self, stage: &str) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| TransformError::new(stage, &self.source, format!("not valid UTF-8: {}", e)))
    }
}

/// Per-run information handed to every transform
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Stage label, used in errors
    pub stage: String,
    /// Stage source base directory
    pub src_root: PathBuf,
    /// Build mode
    pub mode: BuildMode,
}

impl TransformContext {
    pub fn new(stage: &Stage, mode: BuildMode) -> Self {
        Self {
            stage: stage.name.clone(),
            src_root: stage.src.clone(),
            mode,
        }
    }

    pub fn error(&self, path: &Path, message: impl ToString) -> TransformError {
        TransformError::new(&self.stage, path, message)
    }
}

/// Per-file transform
#[async_trait]
pub trait Transform: Send + Sync {
    /// Tag used in logs
    fn tag(&self) -> &'static str;

    /// Accepted content type
    fn input(&self) -> ContentType;

    /// Produced content type ([`ContentType::Any`] keeps the input type)
    fn output(&self) -> ContentType;

    /// Output path for an input path, both relative to the stage roots
    fn rename(&self, rel_path: &Path) -> PathBuf {
        rel_path.to_path_buf()
    }

    /// Partials are only reachable from other files and produce no output
    fn is_partial(&self, _rel_path: &Path) -> bool {
        false
    }

    /// Line N of a development build's output is line N of its input
    fn preserves_lines(&self) -> bool {
        false
    }

    /// Transform one asset
    async fn apply(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError>;
}

/// Folds the per-file results of an aggregating stage into its outputs
pub trait Combine: Send + Sync {
    fn tag(&self) -> &'static str;

    /// Accepted content type of every part
    fn input(&self) -> ContentType;

    /// Produced content type ([`ContentType::Any`] keeps the input type)
    fn output(&self) -> ContentType;

    /// Name of the combined file
    fn output_name(&self) -> &str;

    /// Build the combined output (and companions such as source maps)
    fn combine(&self, parts: &[Part<'_>], ctx: &TransformContext) -> Result<Vec<Asset>, TransformError>;
}

/// Transforms resolved for one stage
pub struct StagePlan {
    pub per_file: Vec<Box<dyn Transform>>,
    pub combine: Option<Box<dyn Combine>>,
}

impl StagePlan {
    /// Resolve the stage's steps into collaborators
    pub fn for_stage(stage: &Stage) -> Self {
        let mut per_file: Vec<Box<dyn Transform>> = Vec::new();
        let mut combine: Option<Box<dyn Combine>> = None;

        for step in &stage.steps {
            match step {
                TransformStep::TemplateRender => per_file.push(Box::new(TemplateRender)),
                TransformStep::StyleCompile => per_file.push(Box::new(StyleCompile)),
                TransformStep::ImageOptimize { level } => {
                    per_file.push(Box::new(ImageOptimize::new(*level)))
                }
                TransformStep::RawCopy => per_file.push(Box::new(RawCopy)),
                TransformStep::ScriptBundle { output } => {
                    per_file.push(Box::new(ScriptMinify));
                    combine = Some(Box::new(Self::joiner(output, &per_file)));
                }
                TransformStep::SpriteBuild { output } => {
                    per_file.push(Box::new(SvgSymbol));
                    combine = Some(Box::new(SpriteSheet::new(output)));
                }
                TransformStep::Concat { output } => {
                    combine = Some(Box::new(Self::joiner(output, &per_file)));
                }
            }
        }

        Self { per_file, combine }
    }

    /// Source maps only make sense when every part keeps its line layout
    fn joiner(output: &str, per_file: &[Box<dyn Transform>]) -> Joiner {
        Joiner::new(output).with_source_map(per_file.iter().all(|step| step.preserves_lines()))
    }

    /// `(tag, input, output)` of every collaborator, in application order
    pub fn contracts(&self) -> Vec<(&'static str, ContentType, ContentType)> {
        let per_file = self
            .per_file
            .iter()
            .map(|step| (step.tag(), step.input(), step.output()));
        let combine = self
            .combine
            .iter()
            .map(|step| (step.tag(), step.input(), step.output()));
        per_file.chain(combine).collect()
    }

    /// Final output path of a source, relative to the stage destination
    pub fn output_rel_path(&self, rel_path: &Path) -> PathBuf {
        self.per_file
            .iter()
            .fold(rel_path.to_path_buf(), |path, step| step.rename(&path))
    }

    pub fn is_partial(&self, rel_path: &Path) -> bool {
        self.per_file.iter().any(|step| step.is_partial(rel_path))
    }

    /// Run every per-file transform over one asset
    pub async fn apply(
        &self,
        mut asset: Asset,
        ctx: &TransformContext,
    ) -> Result<Asset, TransformError> {
        for step in &self.per_file {
            tracing::debug!(stage = %ctx.stage, step = step.tag(), file = %asset.source.display(), "transform");
            asset = step.apply(asset, ctx).await?;
        }
        Ok(asset)
    }
}

/// Resolve a stage's glob patterns to a sorted set of files
pub fn resolve_sources(stage: &Stage) -> Result<BTreeSet<PathBuf>, AssetflowError> {
    resolve_patterns(&stage.glob_patterns())
}

/// Resolve a stage's dependency patterns. Files under a destination nested
/// inside `src` are the stage's own outputs and are skipped.
pub fn resolve_watched(stage: &Stage) -> Result<BTreeSet<PathBuf>, AssetflowError> {
    let nested_dest = stage.dest != stage.src && stage.dest.starts_with(&stage.src);
    let files = resolve_patterns(&stage.watch_glob_patterns())?;
    Ok(files
        .into_iter()
        .filter(|file| !(nested_dest && file.starts_with(&stage.dest)))
        .collect())
}

fn resolve_patterns(patterns: &[String]) -> Result<BTreeSet<PathBuf>, AssetflowError> {
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let matches = glob::glob(pattern)?;
        for entry in matches.filter_map(Result::ok) {
            if entry.is_file() {
                files.insert(entry);
            }
        }
    }

    Ok(files)
}

/// Path of `source` relative to the stage's source root
pub fn relative_to_root(stage: &Stage, source: &Path) -> PathBuf {
    source
        .strip_prefix(&stage.src)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default())
}

/// Slash-separated form of a relative path, for template names and maps
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Files whose name starts with `_` are partials
pub(crate) fn has_partial_name(rel_path: &Path) -> bool {
    rel_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(steps: Vec<TransformStep>) -> Stage {
        Stage::new("test", "/src", vec!["*".into()], "/dist", steps)
    }

    #[test]
    fn test_plan_splits_aggregate_step() {
        let plan = StagePlan::for_stage(&stage(vec![
            TransformStep::StyleCompile,
            TransformStep::Concat {
                output: "all.css".into(),
            },
        ]));

        assert_eq!(plan.per_file.len(), 1);
        assert_eq!(plan.combine.as_ref().map(|c| c.output_name()), Some("all.css"));
        assert_eq!(
            plan.contracts(),
            vec![
                ("style-compile", ContentType::Stylesheet, ContentType::Css),
                ("concat", ContentType::Any, ContentType::Any),
            ]
        );
    }

    #[test]
    fn test_source_maps_follow_line_layout() {
        let plan = StagePlan::for_stage(&stage(vec![TransformStep::ScriptBundle {
            output: "app.js".into(),
        }]));
        assert!(plan.per_file.iter().all(|step| step.preserves_lines()));

        let plan = StagePlan::for_stage(&stage(vec![TransformStep::StyleCompile]));
        assert!(!plan.per_file[0].preserves_lines());
    }

    #[test]
    fn test_resolve_watched_skips_nested_destination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("parts")).unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("index.html"), "i").unwrap();
        std::fs::write(dir.path().join("parts/_nav.html"), "n").unwrap();
        std::fs::write(dir.path().join("out/index.html"), "o").unwrap();

        let stage = Stage::new(
            "html",
            dir.path(),
            vec!["*.html".into()],
            dir.path().join("out"),
            vec![TransformStep::TemplateRender],
        )
        .with_watch(&["**/*.html"]);
        let files: Vec<_> = resolve_watched(&stage).unwrap().into_iter().collect();

        assert_eq!(
            files,
            vec![dir.path().join("index.html"), dir.path().join("parts/_nav.html")]
        );
    }

    #[test]
    fn test_output_rel_path_applies_renames() {
        let plan = StagePlan::for_stage(&stage(vec![TransformStep::TemplateRender]));
        assert_eq!(
            plan.output_rel_path(Path::new("pages/index.html.j2")),
            PathBuf::from("pages/index.html")
        );

        let plan = StagePlan::for_stage(&stage(vec![TransformStep::StyleCompile]));
        assert_eq!(plan.output_rel_path(Path::new("main.scss")), PathBuf::from("main.css"));
        assert!(plan.is_partial(Path::new("_vars.scss")));
        assert!(!plan.is_partial(Path::new("main.scss")));
    }

    #[test]
    fn test_content_type_compatibility() {
        assert!(ContentType::Any.feeds(ContentType::Css));
        assert!(ContentType::Css.feeds(ContentType::Any));
        assert!(ContentType::Svg.feeds(ContentType::Svg));
        assert!(!ContentType::Html.feeds(ContentType::Stylesheet));
    }

    #[test]
    fn test_resolve_sources_is_sorted_and_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.js"), "b").unwrap();
        std::fs::write(dir.path().join("a.js"), "a").unwrap();
        std::fs::create_dir(dir.path().join("c.js")).unwrap();

        let stage = Stage::new(
            "js",
            dir.path(),
            vec!["*.js".into()],
            dir.path().join("out"),
            vec![TransformStep::RawCopy],
        );
        let files: Vec<_> = resolve_sources(&stage).unwrap().into_iter().collect();

        assert_eq!(files, vec![dir.path().join("a.js"), dir.path().join("b.js")]);
        assert_eq!(relative_to_root(&stage, &files[0]), PathBuf::from("a.js"));
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(slash_path(Path::new("a/b/c.html")), "a/b/c.html");
    }
}
