// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Stylesheet compilation via grass

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{has_partial_name, Asset, ContentType, Transform, TransformContext};
use crate::errors::TransformError;

/// `style-compile` step
pub struct StyleCompile;

impl StyleCompile {
    fn compile(source: String, dir: PathBuf, ctx: &TransformContext) -> Result<String, String> {
        let style = if ctx.mode.is_development() {
            grass::OutputStyle::Expanded
        } else {
            grass::OutputStyle::Compressed
        };

        let options = grass::Options::default()
            .style(style)
            .load_path(&dir)
            .load_path(&ctx.src_root);

        grass::from_string(source, &options).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Transform for StyleCompile {
    fn tag(&self) -> &'static str {
        "style-compile"
    }

    fn input(&self) -> ContentType {
        ContentType::Stylesheet
    }

    fn output(&self) -> ContentType {
        ContentType::Css
    }

    fn rename(&self, rel_path: &Path) -> PathBuf {
        rel_path.with_extension("css")
    }

    fn is_partial(&self, rel_path: &Path) -> bool {
        has_partial_name(rel_path)
    }

    async fn apply(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError> {
        let source = asset.text(&ctx.stage)?.to_string();
        let dir = asset
            .source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ctx.src_root.clone());
        let compile_ctx = ctx.clone();

        let css = tokio::task::spawn_blocking(move || Self::compile(source, dir, &compile_ctx))
            .await
            .map_err(|e| ctx.error(&asset.source, e))?
            .map_err(|message| ctx.error(&asset.source, message))?;

        Ok(Asset {
            rel_path: self.rename(&asset.rel_path),
            contents: css.into_bytes(),
            source: asset.source,
        })
    }
}
