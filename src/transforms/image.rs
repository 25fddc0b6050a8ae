// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Lossless image optimization
//!
//! Strips metadata that browsers never read: textual and timestamp chunks
//! from PNG files, comments and non-colour APPn segments from JPEG files.
//! Pixel data is copied byte for byte. Unrecognized formats pass through.

use async_trait::async_trait;

use super::{Asset, ContentType, Transform, TransformContext};
use crate::errors::TransformError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const PNG_DROPPED: [&[u8; 4]; 4] = [b"tEXt", b"zTXt", b"iTXt", b"tIME"];

const JPEG_SOI: [u8; 2] = [0xff, 0xd8];
const JPEG_SOS: u8 = 0xda;
const JPEG_EOI: u8 = 0xd9;
const JPEG_COM: u8 = 0xfe;
// ICC profiles and Adobe colour transforms change rendering
const JPEG_KEPT_APP: [u8; 2] = [0xe2, 0xee];

/// `image-optimize` step
pub struct ImageOptimize {
    level: u8,
}

impl ImageOptimize {
    pub fn new(level: u8) -> Self {
        Self { level }
    }

    /// Optimize an encoded image; `Ok(None)` means the format is unknown
    pub fn optimize(&self, data: &[u8]) -> Result<Option<Vec<u8>>, String> {
        if self.level == 0 {
            return Ok(Some(data.to_vec()));
        }
        if data.starts_with(&PNG_SIGNATURE) {
            return strip_png(data).map(Some);
        }
        if data.starts_with(&JPEG_SOI) {
            return strip_jpeg(data).map(Some);
        }
        Ok(None)
    }
}

fn strip_png(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut pos = PNG_SIGNATURE.len();
    loop {
        let header = data
            .get(pos..pos + 8)
            .ok_or_else(|| format!("truncated PNG chunk header at byte {}", pos))?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = &header[4..8];
        // header + data + crc
        let end = pos + 8 + length + 4;
        let chunk = data
            .get(pos..end)
            .ok_or_else(|| format!("truncated PNG chunk {}", String::from_utf8_lossy(kind)))?;

        if !PNG_DROPPED.iter().any(|d| d.as_slice() == kind) {
            out.extend_from_slice(chunk);
        }
        pos = end;

        if kind == b"IEND" {
            return Ok(out);
        }
    }
}

fn strip_jpeg(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&JPEG_SOI);

    let mut pos = JPEG_SOI.len();
    loop {
        if data.get(pos) != Some(&0xff) {
            return Err(format!("expected JPEG marker at byte {}", pos));
        }
        // fill bytes
        while data.get(pos + 1) == Some(&0xff) {
            pos += 1;
        }
        let marker = *data
            .get(pos + 1)
            .ok_or_else(|| "truncated JPEG marker".to_string())?;

        if marker == JPEG_EOI {
            out.extend_from_slice(&[0xff, JPEG_EOI]);
            return Ok(out);
        }
        if (0xd0..=0xd7).contains(&marker) || marker == 0x01 {
            out.extend_from_slice(&[0xff, marker]);
            pos += 2;
            continue;
        }

        let len_bytes = data
            .get(pos + 2..pos + 4)
            .ok_or_else(|| format!("truncated JPEG segment 0x{:02x}", marker))?;
        let length = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        let end = pos + 2 + length;
        let segment = data
            .get(pos..end)
            .ok_or_else(|| format!("truncated JPEG segment 0x{:02x}", marker))?;

        if marker == JPEG_SOS {
            // entropy-coded data through EOI
            out.extend_from_slice(&data[pos..]);
            return Ok(out);
        }

        let is_dropped_app = (0xe1..=0xef).contains(&marker) && !JPEG_KEPT_APP.contains(&marker);
        if marker != JPEG_COM && !is_dropped_app {
            out.extend_from_slice(segment);
        }
        pos = end;
    }
}

#[async_trait]
impl Transform for ImageOptimize {
    fn tag(&self) -> &'static str {
        "image-optimize"
    }

    fn input(&self) -> ContentType {
        ContentType::Image
    }

    fn output(&self) -> ContentType {
        ContentType::Image
    }

    async fn apply(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError> {
        let optimizer = ImageOptimize::new(self.level);
        let Asset {
            source,
            rel_path,
            contents,
        } = asset;

        let result = tokio::task::spawn_blocking(move || {
            let optimized = optimizer.optimize(&contents);
            (contents, optimized)
        })
        .await
        .map_err(|e| ctx.error(&source, e))?;

        let contents = match result {
            (_, Ok(Some(optimized))) => optimized,
            (original, Ok(None)) => {
                tracing::debug!(file = %source.display(), "unrecognized image format, copied as is");
                original
            }
            (_, Err(message)) => return Err(ctx.error(&source, message)),
        };

        Ok(Asset {
            source,
            rel_path,
            contents,
        })
    }
}
