// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Line-level Source Map v3 for concatenated outputs

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap<'a> {
    version: u8,
    file: &'a str,
    source_root: &'a str,
    sources: &'a [String],
    names: [&'a str; 0],
    mappings: &'a str,
}

/// Maps every generated line back to the same line of its source file
pub struct SourceMapBuilder {
    file: String,
    sources: Vec<String>,
    mappings: String,
    prev_source: i64,
    prev_line: i64,
}

impl SourceMapBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sources: Vec::new(),
            mappings: String::new(),
            prev_source: 0,
            prev_line: 0,
        }
    }

    /// Append `lines` generated lines that come from `source`
    pub fn add_source(&mut self, source: impl Into<String>, lines: usize) {
        let index = self.sources.len() as i64;
        self.sources.push(source.into());

        for line in 0..lines as i64 {
            if !self.mappings.is_empty() {
                self.mappings.push(';');
            }
            // generated column, source index, source line, source column
            encode_vlq(&mut self.mappings, 0);
            encode_vlq(&mut self.mappings, index - self.prev_source);
            encode_vlq(&mut self.mappings, line - self.prev_line);
            encode_vlq(&mut self.mappings, 0);
            self.prev_source = index;
            self.prev_line = line;
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SourceMap {
            version: 3,
            file: &self.file,
            source_root: "",
            sources: &self.sources,
            names: [],
            mappings: &self.mappings,
        })
    }
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(&mut out, value);
        out
    }

    #[test]
    fn test_vlq_encoding() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
    }

    #[test]
    fn test_mappings_follow_sources() {
        let mut map = SourceMapBuilder::new("bundle.js");
        map.add_source("a.js", 2);
        map.add_source("b.js", 1);

        // a:0, a:1, then b:0 (source +1, line -1)
        assert_eq!(map.mappings, "AAAA;AACA;ACDA");

        let json = map.to_json().unwrap();
        assert!(json.contains("\"version\":3"));
        assert!(json.contains("\"sources\":[\"a.js\",\"b.js\"]"));
        assert!(json.contains("\"file\":\"bundle.js\""));
    }
}
