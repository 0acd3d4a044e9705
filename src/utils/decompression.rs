//! Gzip detection and decompression for fetched EPG payloads
//!
//! Several EPG providers publish `.gz` files or serve gzip bodies without
//! honoring Accept-Encoding semantics, so detection goes by magic bytes
//! rather than headers or file extensions.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check for the gzip magic bytes
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0..2] == GZIP_MAGIC
}

/// Decompress gzip payloads; anything else passes through unchanged
pub fn decompress(data: Vec<u8>) -> Result<Vec<u8>> {
    if !is_gzip(&data) {
        return Ok(data);
    }

    let mut decoder = GzDecoder::new(data.as_slice());
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .context("Failed to decompress gzip data")?;
    Ok(decompressed)
}
