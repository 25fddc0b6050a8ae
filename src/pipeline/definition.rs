// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline definition structures
//!
//! Defines the schema of the path table (`assetflow.yaml`) and the
//! immutable [`Pipeline`] of [`Stage`]s built from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{AssetflowError, AssetflowResult};

/// Environment variable selecting the build mode
pub const MODE_ENV: &str = "ASSETFLOW_ENV";

/// Fallback environment variable, kept for projects migrating from node tooling
pub const MODE_ENV_FALLBACK: &str = "NODE_ENV";

/// Build mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Pretty output and source maps
    #[default]
    Development,
    /// Minified output, no source maps
    Production,
}

impl BuildMode {
    /// Read the build mode from the environment
    pub fn from_env() -> Self {
        let value = std::env::var(MODE_ENV)
            .or_else(|_| std::env::var(MODE_ENV_FALLBACK))
            .ok();
        Self::from_value(value.as_deref())
    }

    /// Unset, empty or `development` is development, anything else is
    /// production
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            None | Some("") | Some("development") => Self::Development,
            Some(_) => Self::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Path table loaded from `assetflow.yaml` (or `.json` / `.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetConfig {
    /// Destination root, purged by `clean`
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Logical name → source/destination mapping
    #[serde(default)]
    pub paths: PathTable,

    /// Watch settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl AssetConfig {
    /// Load a path table, choosing the parser by file extension
    pub fn from_file(path: &Path) -> AssetflowResult<Self> {
        if !path.exists() {
            return Err(AssetflowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| AssetflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn from_yaml(yaml: &str) -> AssetflowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> AssetflowResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    pub fn from_toml(source: &str) -> AssetflowResult<Self> {
        toml::from_str(source).map_err(Into::into)
    }
}

/// Mapping of logical names to their paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonts: Option<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libs: Option<PathEntry>,

    /// Any other name is a custom stage and must spell out `glob` and `steps`
    #[serde(flatten)]
    pub custom: BTreeMap<String, PathEntry>,
}

impl PathTable {
    /// Configured entries: well-known names in [`AssetKind::ALL`] order,
    /// then custom names alphabetically
    pub fn entries(&self) -> Vec<(&str, Option<AssetKind>, &PathEntry)> {
        let known = AssetKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).map(|entry| (kind.name(), Some(*kind), entry)));
        let custom = self
            .custom
            .iter()
            .map(|(name, entry)| (name.as_str(), None, entry));
        known.chain(custom).collect()
    }

    pub fn get(&self, kind: AssetKind) -> Option<&PathEntry> {
        match kind {
            AssetKind::Html => self.html.as_ref(),
            AssetKind::Css => self.css.as_ref(),
            AssetKind::Js => self.js.as_ref(),
            AssetKind::Fonts => self.fonts.as_ref(),
            AssetKind::Img => self.img.as_ref(),
            AssetKind::Svg => self.svg.as_ref(),
            AssetKind::Libs => self.libs.as_ref(),
        }
    }
}

/// One row of the path table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathEntry {
    /// Source base directory
    pub src: PathBuf,

    /// Destination directory
    pub dest: PathBuf,

    /// Glob patterns relative to `src` (defaults depend on the logical name)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glob: Vec<String>,

    /// Extra patterns relative to `src` for files the stage reads without
    /// building them (includes, imports); a change re-runs the whole stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch: Vec<String>,

    /// Combined output file name for aggregating stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Override the default predecessor stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,

    /// Override the default transform steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<TransformStep>>,
}

/// Well-known logical names of the path table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Html,
    Css,
    Js,
    Fonts,
    Img,
    Svg,
    Libs,
}

impl AssetKind {
    /// Static copies first, derived assets last
    pub const ALL: [AssetKind; 7] = [
        Self::Fonts,
        Self::Libs,
        Self::Img,
        Self::Svg,
        Self::Html,
        Self::Css,
        Self::Js,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Fonts => "fonts",
            Self::Img => "img",
            Self::Svg => "svg",
            Self::Libs => "libs",
        }
    }

    /// Static assets are copied (or optimized) rather than compiled
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Fonts | Self::Libs | Self::Img | Self::Svg)
    }

    pub fn default_globs(&self) -> Vec<String> {
        let globs: &[&str] = match self {
            Self::Html => &["*.html"],
            Self::Css => &["*.scss"],
            Self::Js => &["*.js"],
            Self::Fonts => &[
                "**/*.ttf",
                "**/*.woff",
                "**/*.woff2",
                "**/*.eot",
                "**/*.svg",
            ],
            Self::Img => &["**/*.png", "**/*.jpg", "**/*.jpeg"],
            Self::Svg => &["*.svg"],
            Self::Libs => &["*"],
        };
        globs.iter().map(|g| g.to_string()).collect()
    }

    /// Files templates and stylesheets can pull in from anywhere under `src`
    pub fn default_watch(&self) -> Vec<String> {
        let globs: &[&str] = match self {
            Self::Html => &["**/*.html", "**/*.j2", "**/*.jinja", "**/*.jinja2"],
            Self::Css => &["**/*.scss", "**/*.sass"],
            _ => &[],
        };
        globs.iter().map(|g| g.to_string()).collect()
    }

    pub fn default_output(&self) -> Option<&'static str> {
        match self {
            Self::Css => Some("custom.min.css"),
            Self::Js => Some("common.min.js"),
            Self::Svg => Some("sprite-svg.svg"),
            _ => None,
        }
    }

    pub fn default_steps(&self, output: Option<String>) -> Vec<TransformStep> {
        let output = output
            .or_else(|| self.default_output().map(str::to_string))
            .unwrap_or_default();

        match self {
            Self::Html => vec![TransformStep::TemplateRender],
            Self::Css => vec![TransformStep::StyleCompile, TransformStep::Concat { output }],
            Self::Js => vec![TransformStep::ScriptBundle { output }],
            Self::Fonts | Self::Libs => vec![TransformStep::RawCopy],
            Self::Img => vec![TransformStep::ImageOptimize {
                level: default_image_level(),
            }],
            Self::Svg => vec![TransformStep::SpriteBuild { output }],
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named transform step. Steps run in declaration order; an aggregate
/// step may only appear last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransformStep {
    /// Render a template page to HTML
    TemplateRender,
    /// Compile a stylesheet to CSS
    StyleCompile,
    /// Minify scripts (production) and join them into one bundle
    ScriptBundle { output: String },
    /// Strip non-essential image metadata
    ImageOptimize {
        #[serde(default = "default_image_level")]
        level: u8,
    },
    /// Combine SVG icons into one symbol sprite
    SpriteBuild { output: String },
    /// Join inputs into one file
    Concat { output: String },
    /// Copy bytes unchanged
    RawCopy,
}

fn default_image_level() -> u8 {
    1
}

impl TransformStep {
    /// Tag used in configuration and logs
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TemplateRender => "template-render",
            Self::StyleCompile => "style-compile",
            Self::ScriptBundle { .. } => "script-bundle",
            Self::ImageOptimize { .. } => "image-optimize",
            Self::SpriteBuild { .. } => "sprite-build",
            Self::Concat { .. } => "concat",
            Self::RawCopy => "raw-copy",
        }
    }

    /// Combined output name if this step aggregates its inputs
    pub fn aggregate_output(&self) -> Option<&str> {
        match self {
            Self::ScriptBundle { output }
            | Self::SpriteBuild { output }
            | Self::Concat { output } => Some(output),
            _ => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate_output().is_some()
    }
}

/// Watch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
        }
    }
}

fn default_debounce() -> u64 {
    200
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// A single pipeline stage. Immutable once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Stage name (unique within the pipeline)
    pub name: String,
    /// Source base directory
    pub src: PathBuf,
    /// Glob patterns relative to `src`
    pub patterns: Vec<String>,
    /// Dependency patterns relative to `src`, beyond `patterns`
    pub watch: Vec<String>,
    /// Destination directory
    pub dest: PathBuf,
    /// Ordered transform steps
    pub steps: Vec<TransformStep>,
    /// Stages that must complete first
    pub depends_on: Vec<String>,
}

impl Stage {
    /// Create a stage with no dependencies
    pub fn new(
        name: impl Into<String>,
        src: impl Into<PathBuf>,
        patterns: Vec<String>,
        dest: impl Into<PathBuf>,
        steps: Vec<TransformStep>,
    ) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
            patterns,
            watch: Vec::new(),
            dest: dest.into(),
            steps,
            depends_on: Vec::new(),
        }
    }

    pub fn with_watch(mut self, patterns: &[&str]) -> Self {
        self.watch = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_depends_on(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    /// The aggregate step, when the stage combines its inputs
    pub fn aggregate_step(&self) -> Option<&TransformStep> {
        self.steps.last().filter(|step| step.is_aggregate())
    }

    pub fn is_aggregating(&self) -> bool {
        self.aggregate_step().is_some()
    }

    /// Steps applied to each admitted file individually
    pub fn per_file_steps(&self) -> &[TransformStep] {
        match self.aggregate_step() {
            Some(_) => &self.steps[..self.steps.len() - 1],
            None => &self.steps,
        }
    }

    /// Full glob patterns (`src` joined with each relative pattern)
    pub fn glob_patterns(&self) -> Vec<String> {
        self.absolute(&self.patterns)
    }

    /// Full dependency patterns
    pub fn watch_glob_patterns(&self) -> Vec<String> {
        self.absolute(&self.watch)
    }

    /// Every relative pattern whose matches affect the stage's outputs
    pub fn watch_patterns(&self) -> Vec<&str> {
        let mut all: Vec<&str> = Vec::with_capacity(self.patterns.len() + self.watch.len());
        for pattern in self.patterns.iter().chain(&self.watch) {
            if !all.contains(&pattern.as_str()) {
                all.push(pattern);
            }
        }
        all
    }

    fn absolute(&self, patterns: &[String]) -> Vec<String> {
        patterns
            .iter()
            .map(|pattern| self.src.join(pattern).to_string_lossy().to_string())
            .collect()
    }

    /// Short description of the steps for plans and graphs
    pub fn step_summary(&self) -> String {
        self.steps
            .iter()
            .map(TransformStep::tag)
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

fn custom_entry_error(name: &str, field: &str) -> AssetflowError {
    AssetflowError::invalid_config(
        format!("path entry '{}' has no `{}`", name, field),
        Some("only html, css, js, fonts, img, svg and libs have defaults; other names must list `glob` and `steps`"),
    )
}

/// The full, immutable stage graph
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Destination root
    pub base_dir: PathBuf,
    /// Build mode
    pub mode: BuildMode,
    /// Stages, static copies first
    pub stages: Vec<Stage>,
    /// Watch settings
    pub watch: WatchConfig,
    /// Dev server settings
    pub server: ServerConfig,
}

impl Pipeline {
    /// Load a path table and build the pipeline; relative paths resolve
    /// against the directory holding the file
    pub fn load(path: &Path, mode: BuildMode) -> AssetflowResult<Self> {
        let config = AssetConfig::from_file(path)?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_config(&config, root, mode)
    }

    /// Build stages from a path table
    pub fn from_config(config: &AssetConfig, root: &Path, mode: BuildMode) -> AssetflowResult<Self> {
        let entries = config.paths.entries();
        let static_names: Vec<String> = entries
            .iter()
            .filter(|(_, kind, _)| kind.is_some_and(|k| k.is_static()))
            .map(|(name, _, _)| name.to_string())
            .collect();

        let mut stages = Vec::with_capacity(entries.len());
        for (name, kind, entry) in entries {
            let patterns = match kind {
                _ if !entry.glob.is_empty() => entry.glob.clone(),
                Some(kind) => kind.default_globs(),
                None => return Err(custom_entry_error(name, "glob")),
            };

            let steps = match (&entry.steps, kind) {
                (Some(steps), _) => steps.clone(),
                (None, Some(kind)) => kind.default_steps(entry.output.clone()),
                (None, None) => return Err(custom_entry_error(name, "steps")),
            };

            let watch = match kind {
                _ if !entry.watch.is_empty() => entry.watch.clone(),
                Some(kind) => kind.default_watch(),
                None => Vec::new(),
            };

            let depends_on = match &entry.depends_on {
                Some(deps) => deps.clone(),
                None if kind.is_some_and(|k| k.is_static()) => Vec::new(),
                None => static_names.clone(),
            };

            stages.push(Stage {
                name: name.to_string(),
                src: root.join(&entry.src),
                patterns,
                watch,
                dest: root.join(&entry.dest),
                steps,
                depends_on,
            });
        }

        Ok(Self {
            base_dir: root.join(&config.base_dir),
            mode,
            stages,
            watch: config.watch.clone(),
            server: config.server.clone(),
        })
    }

    /// Build a pipeline from explicit stages
    pub fn new(base_dir: impl Into<PathBuf>, mode: BuildMode, stages: Vec<Stage>) -> Self {
        Self {
            base_dir: base_dir.into(),
            mode,
            stages,
            watch: WatchConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
base_dir: dist
paths:
  html: { src: src/templates, dest: dist }
  css: { src: src/styles, dest: dist/css }
  js: { src: src/scripts, dest: dist/js, output: app.js }
  fonts: { src: src/fonts, dest: dist/fonts }
  svg: { src: src/svg, dest: dist/svg }
"#;

    #[test]
    fn test_parse_path_table() {
        let config = AssetConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("dist"));
        assert!(config.paths.html.is_some());
        assert!(config.paths.img.is_none());
        assert_eq!(config.watch.debounce_ms, 200);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_defaults_fill_globs_and_steps() {
        let config = AssetConfig::from_yaml(SAMPLE).unwrap();
        let pipeline = Pipeline::from_config(&config, Path::new("/site"), BuildMode::Development).unwrap();

        let css = pipeline.get_stage("css").unwrap();
        assert_eq!(css.patterns, vec!["*.scss".to_string()]);
        assert_eq!(css.src, PathBuf::from("/site/src/styles"));
        assert_eq!(
            css.aggregate_step(),
            Some(&TransformStep::Concat {
                output: "custom.min.css".into()
            })
        );
        assert_eq!(css.per_file_steps(), &[TransformStep::StyleCompile]);

        let js = pipeline.get_stage("js").unwrap();
        assert_eq!(js.aggregate_step().and_then(|s| s.aggregate_output()), Some("app.js"));

        let fonts = pipeline.get_stage("fonts").unwrap();
        assert!(!fonts.is_aggregating());
        assert_eq!(fonts.patterns.len(), 5);
        assert!(fonts.watch.is_empty());

        let html = pipeline.get_stage("html").unwrap();
        assert_eq!(html.patterns, vec!["*.html".to_string()]);
        assert!(html.watch_patterns().contains(&"**/*.html"));
    }

    #[test]
    fn test_custom_entries_become_stages() {
        let yaml = r#"
paths:
  fonts: { src: src/fonts, dest: dist/fonts }
  css: { src: src/styles, dest: dist/css, glob: ["custom/*.scss"] }
  bootstrap-css:
    src: src/styles
    dest: dist/css
    glob: ["bootstrap.scss"]
    steps:
      - type: style-compile
      - type: concat
        output: bootstrap.min.css
"#;
        let config = AssetConfig::from_yaml(yaml).unwrap();
        let pipeline = Pipeline::from_config(&config, Path::new("."), BuildMode::Production).unwrap();

        assert_eq!(pipeline.stage_names(), vec!["fonts", "css", "bootstrap-css"]);
        let bootstrap = pipeline.get_stage("bootstrap-css").unwrap();
        assert_eq!(bootstrap.depends_on, vec!["fonts".to_string()]);
        assert_eq!(
            bootstrap.aggregate_step().and_then(|s| s.aggregate_output()),
            Some("bootstrap.min.css")
        );
    }

    #[test]
    fn test_custom_entry_without_steps_is_rejected() {
        let yaml = "paths:\n  bootstrap-js: { src: vendor, dest: dist/js, glob: [\"*.js\"] }\n";
        let config = AssetConfig::from_yaml(yaml).unwrap();
        let err = Pipeline::from_config(&config, Path::new("."), BuildMode::Production).unwrap_err();

        assert!(matches!(err, AssetflowError::InvalidConfig { .. }));
        assert!(err.to_string().contains("bootstrap-js"));
    }

    #[test]
    fn test_misspelled_field_is_rejected() {
        let yaml = "paths:\n  css: { sorce: src/styles, src: s, dest: d }\n";
        assert!(AssetConfig::from_yaml(yaml).is_err());
        assert!(AssetConfig::from_yaml("bse_dir: out\n").is_err());
    }

    #[test]
    fn test_derived_stages_depend_on_static_ones() {
        let config = AssetConfig::from_yaml(SAMPLE).unwrap();
        let pipeline = Pipeline::from_config(&config, Path::new("."), BuildMode::Development).unwrap();

        assert_eq!(pipeline.stage_names(), vec!["fonts", "svg", "html", "css", "js"]);
        assert!(pipeline.get_stage("fonts").unwrap().depends_on.is_empty());
        assert_eq!(
            pipeline.get_stage("html").unwrap().depends_on,
            vec!["fonts".to_string(), "svg".to_string()]
        );
    }

    #[test]
    fn test_explicit_overrides() {
        let yaml = r#"
paths:
  css:
    src: styles
    dest: out
    glob: ["parts/*.scss"]
    depends_on: []
    steps:
      - type: raw-copy
      - type: concat
        output: all.css
"#;
        let config = AssetConfig::from_yaml(yaml).unwrap();
        let pipeline = Pipeline::from_config(&config, Path::new("."), BuildMode::Production).unwrap();
        let css = pipeline.get_stage("css").unwrap();

        assert!(css.depends_on.is_empty());
        assert_eq!(css.patterns, vec!["parts/*.scss".to_string()]);
        assert_eq!(css.step_summary(), "raw-copy → concat");
    }

    #[test]
    fn test_json_and_toml_tables() {
        let json = r#"{"paths": {"fonts": {"src": "f", "dest": "d"}}}"#;
        assert!(AssetConfig::from_json(json).unwrap().paths.fonts.is_some());

        let source = "base_dir = \"public\"\n[paths.libs]\nsrc = \"vendor\"\ndest = \"public\"\n";
        let config = AssetConfig::from_toml(source).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("public"));
        assert!(config.paths.libs.is_some());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AssetConfig::from_file(Path::new("/nonexistent/assetflow.yaml")).unwrap_err();
        assert!(matches!(err, AssetflowError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_build_mode_selection() {
        assert_eq!(BuildMode::from_value(None), BuildMode::Development);
        assert_eq!(BuildMode::from_value(Some("development")), BuildMode::Development);
        assert_eq!(BuildMode::from_value(Some("")), BuildMode::Development);
        assert_eq!(BuildMode::from_value(Some("production")), BuildMode::Production);
        assert_eq!(BuildMode::from_value(Some("staging")), BuildMode::Production);
    }

    #[test]
    fn test_image_level_defaults() {
        let steps: Vec<TransformStep> =
            serde_yaml::from_str("- type: image-optimize\n- type: image-optimize\n  level: 0\n")
                .unwrap();
        assert_eq!(steps[0], TransformStep::ImageOptimize { level: 1 });
        assert_eq!(steps[1], TransformStep::ImageOptimize { level: 0 });
    }
}
