// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Content hashing for "seen" markers
//!
//! Uses BLAKE3 for fast, secure content hashing.

/// Marker for a file's content
pub fn hash_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        let hash1 = hash_bytes(b"hello");
        let hash2 = hash_bytes(b"hello");
        let hash3 = hash_bytes(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }
}
