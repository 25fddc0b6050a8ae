// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Template rendering
//!
//! Pages are rendered with minijinja. The loader is rooted at the stage's
//! source directory so `{% include %}` and `{% extends %}` resolve
//! partials next to the pages.

use async_trait::async_trait;
use minijinja::{context, path_loader, Environment};
use std::path::{Path, PathBuf};

use super::{has_partial_name, slash_path, Asset, ContentType, Transform, TransformContext};
use crate::errors::TransformError;

const TEMPLATE_EXTENSIONS: [&str; 3] = ["j2", "jinja", "jinja2"];

/// `template-render` step
pub struct TemplateRender;

impl TemplateRender {
    fn render(source: String, name: String, ctx: &TransformContext) -> Result<String, String> {
        let mut env = Environment::new();
        env.set_loader(path_loader(&ctx.src_root));
        if !ctx.mode.is_development() {
            env.set_trim_blocks(true);
            env.set_lstrip_blocks(true);
        }

        env.render_named_str(
            &name,
            &source,
            context! {
                mode => ctx.mode.to_string(),
                development => ctx.mode.is_development(),
            },
        )
        .map_err(|e| format!("{:#}", e))
    }
}

#[async_trait]
impl Transform for TemplateRender {
    fn tag(&self) -> &'static str {
        "template-render"
    }

    fn input(&self) -> ContentType {
        ContentType::Template
    }

    fn output(&self) -> ContentType {
        ContentType::Html
    }

    fn rename(&self, rel_path: &Path) -> PathBuf {
        let is_template_ext = rel_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TEMPLATE_EXTENSIONS.contains(&e));

        let stem = if is_template_ext {
            rel_path.with_extension("")
        } else {
            rel_path.to_path_buf()
        };

        if stem.extension().is_some_and(|e| e == "html") {
            stem
        } else {
            stem.with_extension("html")
        }
    }

    fn is_partial(&self, rel_path: &Path) -> bool {
        has_partial_name(rel_path)
    }

    async fn apply(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError> {
        let source = asset.text(&ctx.stage)?.to_string();
        let name = slash_path(&asset.rel_path);
        let render_ctx = ctx.clone();

        let rendered = tokio::task::spawn_blocking(move || Self::render(source, name, &render_ctx))
            .await
            .map_err(|e| ctx.error(&asset.source, e))?
            .map_err(|message| ctx.error(&asset.source, message))?;

        Ok(Asset {
            rel_path: self.rename(&asset.rel_path),
            contents: rendered.into_bytes(),
            source: asset.source,
        })
    }
}
