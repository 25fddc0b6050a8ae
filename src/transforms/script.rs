// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Per-file half of the `script-bundle` step
//!
//! Transpilation is out of scope; production builds get a conservative
//! line-level minification. Development builds pass scripts through so the
//! bundle's source map lines up with the originals.

use async_trait::async_trait;

use super::{Asset, ContentType, Transform, TransformContext};
use crate::errors::TransformError;

/// Lexical context the scanner is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// Plain code; the count tracks `{` nesting inside a `${}` substitution
    Code(usize),
    Quote(char),
    Template,
    BlockComment,
}

/// Tracks string, template literal and comment boundaries across lines
struct Scanner {
    stack: Vec<Frame>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Code(0)],
        }
    }

    fn in_code(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Code(_)))
    }

    fn replace_top(&mut self, frame: Frame) {
        if let Some(top) = self.stack.last_mut() {
            *top = frame;
        }
    }

    fn scan(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        let mut continued = false;

        while let Some(c) = chars.next() {
            let Some(&top) = self.stack.last() else {
                break;
            };
            match top {
                Frame::Code(depth) => match c {
                    '\'' | '"' => self.stack.push(Frame::Quote(c)),
                    '`' => self.stack.push(Frame::Template),
                    '/' if chars.peek() == Some(&'/') => break,
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        self.stack.push(Frame::BlockComment);
                    }
                    '{' => self.replace_top(Frame::Code(depth + 1)),
                    '}' if depth == 0 && self.stack.len() > 1 => {
                        self.stack.pop();
                    }
                    '}' => self.replace_top(Frame::Code(depth.saturating_sub(1))),
                    _ => {}
                },
                Frame::Quote(quote) => match c {
                    '\\' => continued = chars.next().is_none(),
                    c if c == quote => {
                        self.stack.pop();
                    }
                    _ => {}
                },
                Frame::Template => match c {
                    '\\' => {
                        chars.next();
                    }
                    '`' => {
                        self.stack.pop();
                    }
                    '$' if chars.peek() == Some(&'{') => {
                        chars.next();
                        self.stack.push(Frame::Code(0));
                    }
                    _ => {}
                },
                Frame::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        self.stack.pop();
                    }
                }
            }
        }

        // Quotes only span lines through a trailing backslash
        if matches!(self.stack.last(), Some(Frame::Quote(_))) && !continued {
            self.stack.pop();
        }
    }
}

/// Drops blank lines and full-line `//` comments and trims indentation,
/// leaving lines inside strings, template literals and block comments
/// untouched
pub struct ScriptMinify;

impl ScriptMinify {
    pub fn minify(source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        let mut scanner = Scanner::new();

        for line in source.lines() {
            let starts_in_code = scanner.in_code();
            scanner.scan(line);

            let mut text = line;
            if starts_in_code {
                text = text.trim_start();
                if text.is_empty() || text.starts_with("//") {
                    continue;
                }
            }
            if scanner.in_code() {
                text = text.trim_end();
            }
            out.push_str(text);
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl Transform for ScriptMinify {
    fn tag(&self) -> &'static str {
        "script-bundle"
    }

    fn input(&self) -> ContentType {
        ContentType::Script
    }

    fn output(&self) -> ContentType {
        ContentType::Script
    }

    /// Maps are development-only, where scripts pass through unchanged
    fn preserves_lines(&self) -> bool {
        true
    }

    async fn apply(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError> {
        if ctx.mode.is_development() {
            return Ok(asset);
        }

        let minified = Self::minify(asset.text(&ctx.stage)?);
        Ok(Asset {
            contents: minified.into_bytes(),
            ..asset
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BuildMode;
    use std::path::PathBuf;

    #[test]
    fn test_minify_drops_comments_and_blank_lines() {
        let src = "// header\nfunction a() {\n    return 1;\n}\n\n  // trailing\nconst url = 'http://x';\n";
        assert_eq!(
            ScriptMinify::minify(src),
            "function a() {\nreturn 1;\n}\nconst url = 'http://x';\n"
        );
    }

    #[test]
    fn test_minify_keeps_template_literal_lines() {
        let src = "const s = `line1\n  // not a comment\n\n    indented`;\n  run(s);\n";
        assert_eq!(
            ScriptMinify::minify(src),
            "const s = `line1\n  // not a comment\n\n    indented`;\nrun(s);\n"
        );
    }

    #[test]
    fn test_minify_tracks_substitutions_and_block_comments() {
        let src = "const t = `a ${ {x: 1}.x } b\n  tail`;\n/* keep\n   // inside */\n  // drop\nlet q = '//';\n";
        assert_eq!(
            ScriptMinify::minify(src),
            "const t = `a ${ {x: 1}.x } b\n  tail`;\n/* keep\n   // inside */\nlet q = '//';\n"
        );
    }

    #[tokio::test]
    async fn test_development_passes_through() {
        let ctx = TransformContext {
            stage: "js".into(),
            src_root: PathBuf::from("."),
            mode: BuildMode::Development,
        };
        let asset = Asset::new("a.js", "a.js", b"  // keep\nx();\n".to_vec());
        let out = ScriptMinify.apply(asset.clone(), &ctx).await.unwrap();

        assert_eq!(out, asset);
    }
}
