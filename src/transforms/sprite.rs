// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! SVG sprite sheets
//!
//! Each icon becomes a `<symbol>` whose id is the file stem, and the sheet
//! wraps all symbols in a hidden root `<svg>` so it can be inlined into a
//! page and referenced with `<use href="#id">`.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{Asset, Combine, ContentType, Transform, TransformContext};
use crate::cache::Part;
use crate::errors::TransformError;

const DROPPED_ATTRIBUTES: [&str; 8] = [
    "width",
    "height",
    "version",
    "id",
    "style",
    "x",
    "y",
    "enable-background",
];

fn prolog_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>|<!--.*?-->").expect("valid prolog regex")
    })
}

fn between_tags_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r">\s+<").expect("valid whitespace regex"))
}

fn root_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<svg\b([^>]*?)/?>").expect("valid root regex"))
}

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*("[^"]*"|'[^']*')"#).expect("valid attribute regex")
    })
}

/// Symbol id for an icon: its file stem, restricted to id-safe characters
pub fn symbol_id(rel_path: &Path) -> String {
    let stem = rel_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Per-file half of `sprite-build`
pub struct SvgSymbol;

impl SvgSymbol {
    pub fn to_symbol(svg: &str, id: &str) -> Result<String, String> {
        let cleaned = prolog_re().replace_all(svg, "");
        let cleaned = between_tags_re().replace_all(cleaned.trim(), "><");

        let root = root_re()
            .captures(&cleaned)
            .ok_or_else(|| "no <svg> root element".to_string())?;
        let whole = root.get(0).ok_or_else(|| "no <svg> root element".to_string())?;
        let self_closing = whole.as_str().ends_with("/>");

        let mut open = format!("<symbol id=\"{}\"", id);
        for attr in attribute_re().captures_iter(&root[1]) {
            let name = &attr[1];
            if name.starts_with("xmlns") || DROPPED_ATTRIBUTES.contains(&name) {
                continue;
            }
            open.push(' ');
            open.push_str(&attr[0]);
        }
        open.push('>');

        if self_closing {
            return Ok(format!("{}</symbol>", open));
        }

        let body = &cleaned[whole.end()..];
        let close = body
            .rfind("</svg>")
            .ok_or_else(|| "missing closing </svg>".to_string())?;

        Ok(format!("{}{}</symbol>", open, &body[..close]))
    }
}

#[async_trait]
impl Transform for SvgSymbol {
    fn tag(&self) -> &'static str {
        "sprite-build"
    }

    fn input(&self) -> ContentType {
        ContentType::Svg
    }

    fn output(&self) -> ContentType {
        ContentType::Svg
    }

    async fn apply(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError> {
        let id = symbol_id(&asset.rel_path);
        let symbol = Self::to_symbol(asset.text(&ctx.stage)?, &id)
            .map_err(|message| ctx.error(&asset.source, message))?;

        Ok(Asset {
            contents: symbol.into_bytes(),
            ..asset
        })
    }
}

/// Aggregate half of `sprite-build`
pub struct SpriteSheet {
    output: String,
}

impl SpriteSheet {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Combine for SpriteSheet {
    fn tag(&self) -> &'static str {
        "sprite-build"
    }

    fn input(&self) -> ContentType {
        ContentType::Svg
    }

    fn output(&self) -> ContentType {
        ContentType::Svg
    }

    fn output_name(&self) -> &str {
        &self.output
    }

    fn combine(&self, parts: &[Part<'_>], ctx: &TransformContext) -> Result<Vec<Asset>, TransformError> {
        let mut symbols = String::new();
        let mut uses_xlink = false;

        for part in parts {
            let text = std::str::from_utf8(part.content)
                .map_err(|e| ctx.error(part.path, format!("not valid UTF-8: {}", e)))?;
            uses_xlink |= text.contains("xlink:");
            symbols.push_str(text.trim());
        }

        let xlink = if uses_xlink {
            " xmlns:xlink=\"http://www.w3.org/1999/xlink\""
        } else {
            ""
        };
        let sheet = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\"{} style=\"display:none\">{}</svg>\n",
            xlink, symbols
        );

        let source = parts
            .first()
            .map(|p| p.path.to_path_buf())
            .unwrap_or_else(|| ctx.src_root.clone());

        Ok(vec![Asset::new(source, PathBuf::from(&self.output), sheet.into_bytes())])
    }
}
