//! Content hashing and gzip handling.
//!
//! A resource whose MIME type carries the `+gzip` suffix stores compressed
//! bytes, but its size and hash describe the decompressed payload. That way
//! the same document uploaded compressed or uncompressed hashes identically.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::error::{Result, TypeError};

const GZIP_SUFFIX: &str = "+gzip";

/// Hex-encoded SHA-256 of `bytes`, or the empty string for empty input.
pub fn content_hash(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    hex::encode(Sha256::digest(bytes))
}

pub fn is_gzip_mime_type(mime_type: &str) -> bool {
    mime_type.contains(GZIP_SUFFIX)
}

/// The MIME type with any `+gzip` suffix removed.
pub fn strip_gzip_mime_type(mime_type: &str) -> String {
    mime_type.replace(GZIP_SUFFIX, "")
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| TypeError::InvalidContents(format!("gzip failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| TypeError::InvalidContents(format!("gzip failed: {e}")))
}

pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| TypeError::InvalidContents(format!("gunzip failed: {e}")))?;
    Ok(out)
}

/// Size and hash of a resource payload as seen by readers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDigest {
    pub hash: String,
    pub size_bytes: i64,
}

impl ContentDigest {
    /// Digest `contents` according to `mime_type`, decompressing gzip payloads.
    pub fn compute(contents: &[u8], mime_type: &str) -> Result<Self> {
        if contents.is_empty() {
            return Ok(Self {
                hash: String::new(),
                size_bytes: 0,
            });
        }
        if is_gzip_mime_type(mime_type) {
            let plain = gunzip(contents)?;
            Ok(Self::of(&plain))
        } else {
            Ok(Self::of(contents))
        }
    }

    fn of(bytes: &[u8]) -> Self {
        Self {
            hash: content_hash(bytes),
            size_bytes: bytes.len() as i64,
        }
    }
}
