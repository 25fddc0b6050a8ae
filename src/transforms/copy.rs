// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pass-through copy and concatenation

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{slash_path, Asset, ContentType, SourceMapBuilder, Transform, TransformContext};
use crate::cache::Part;
use crate::errors::TransformError;

/// `raw-copy` step, files reach the destination unchanged
pub struct RawCopy;

#[async_trait]
impl Transform for RawCopy {
    fn tag(&self) -> &'static str {
        "raw-copy"
    }

    fn input(&self) -> ContentType {
        ContentType::Any
    }

    fn output(&self) -> ContentType {
        ContentType::Any
    }

    fn preserves_lines(&self) -> bool {
        true
    }

    async fn apply(&self, asset: Asset, _ctx: &TransformContext) -> Result<Asset, TransformError> {
        Ok(asset)
    }
}

/// Concatenates parts in path order into a single named output.
///
/// Every part ends with exactly one newline. With source maps enabled,
/// development builds also emit a line-level map next to the output; the
/// parts must then still have the line layout of their sources.
pub struct Joiner {
    output: String,
    source_map: bool,
}

impl Joiner {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            source_map: false,
        }
    }

    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    fn trailer(&self, map_name: &str) -> String {
        if self.output.ends_with(".css") {
            format!("/*# sourceMappingURL={} */\n", map_name)
        } else {
            format!("//# sourceMappingURL={}\n", map_name)
        }
    }
}

fn trim_trailing_newlines(mut content: &[u8]) -> &[u8] {
    while let Some((last, rest)) = content.split_last() {
        if *last == b'\n' || *last == b'\r' {
            content = rest;
        } else {
            break;
        }
    }
    content
}

fn source_name(path: &Path, root: &Path) -> String {
    slash_path(path.strip_prefix(root).unwrap_or(path))
}

impl super::Combine for Joiner {
    fn tag(&self) -> &'static str {
        "concat"
    }

    fn input(&self) -> ContentType {
        ContentType::Any
    }

    fn output(&self) -> ContentType {
        ContentType::Any
    }

    fn output_name(&self) -> &str {
        &self.output
    }

    fn combine(&self, parts: &[Part<'_>], ctx: &TransformContext) -> Result<Vec<Asset>, TransformError> {
        let output = PathBuf::from(&self.output);
        let source = parts
            .first()
            .map(|p| p.path.to_path_buf())
            .unwrap_or_else(|| ctx.src_root.clone());

        let mut joined = Vec::new();
        let mut map = SourceMapBuilder::new(&self.output);

        for part in parts {
            let body = trim_trailing_newlines(part.content);
            if body.is_empty() {
                continue;
            }
            joined.extend_from_slice(body);
            joined.push(b'\n');

            let lines = body.iter().filter(|b| **b == b'\n').count() + 1;
            map.add_source(source_name(part.path, &ctx.src_root), lines);
        }

        if !(self.source_map && ctx.mode.is_development()) {
            return Ok(vec![Asset::new(source, output, joined)]);
        }

        let map_rel = PathBuf::from(format!("{}.map", self.output));
        let map_name = map_rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        joined.extend_from_slice(self.trailer(&map_name).as_bytes());

        let map_json = map
            .to_json()
            .map_err(|e| ctx.error(&source, format!("source map: {}", e)))?;

        Ok(vec![
            Asset::new(source.clone(), output, joined),
            Asset::new(source, map_rel, map_json.into_bytes()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BuildMode;
    use crate::transforms::Combine;

    fn ctx(mode: BuildMode) -> TransformContext {
        TransformContext {
            stage: "css".into(),
            src_root: PathBuf::from("/src"),
            mode,
        }
    }

    #[test]
    fn test_joins_with_single_newlines() {
        let a = Path::new("/src/a.css");
        let b = Path::new("/src/b.css");
        let parts = [
            Part { path: a, content: b".a{}\n\n" },
            Part { path: b, content: b".b{}" },
        ];

        let out = Joiner::new("all.css")
            .combine(&parts, &ctx(BuildMode::Production))
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel_path, PathBuf::from("all.css"));
        assert_eq!(out[0].contents, b".a{}\n.b{}\n");
    }

    #[test]
    fn test_development_emits_source_map() {
        let a = Path::new("/src/lib/a.js");
        let parts = [Part { path: a, content: b"one();\ntwo();\n" }];

        let out = Joiner::new("common.min.js")
            .with_source_map(true)
            .combine(&parts, &ctx(BuildMode::Development))
            .unwrap();

        assert_eq!(out.len(), 2);
        let js = String::from_utf8(out[0].contents.clone()).unwrap();
        assert!(js.ends_with("//# sourceMappingURL=common.min.js.map\n"));

        assert_eq!(out[1].rel_path, PathBuf::from("common.min.js.map"));
        let map: serde_json::Value = serde_json::from_slice(&out[1].contents).unwrap();
        assert_eq!(map["sources"][0], "lib/a.js");
        assert_eq!(map["mappings"], "AAAA;AACA");
    }

    #[test]
    fn test_no_map_unless_enabled() {
        let parts = [Part {
            path: Path::new("/src/a.css"),
            content: b".a{}",
        }];

        let out = Joiner::new("custom.min.css")
            .combine(&parts, &ctx(BuildMode::Development))
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].contents, b".a{}\n");
    }

    #[test]
    fn test_css_trailer_uses_block_comment() {
        let joiner = Joiner::new("custom.min.css");
        assert_eq!(
            joiner.trailer("custom.min.css.map"),
            "/*# sourceMappingURL=custom.min.css.map */\n"
        );
    }

    #[tokio::test]
    async fn test_raw_copy_is_identity() {
        let asset = Asset::new("/src/f.woff", "f.woff", vec![0, 1, 2]);
        let out = RawCopy.apply(asset.clone(), &ctx(BuildMode::Production)).await.unwrap();
        assert_eq!(out, asset);
    }
}
