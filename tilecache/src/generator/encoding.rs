//! Gzip framing for tile payloads.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::GeneratorError;

/// Leading bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether `data` starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Compress `data` at the default level.
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, GeneratorError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| GeneratorError::Encode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| GeneratorError::Encode(e.to_string()))
}

/// Gzip `data` unless it already is. Empty input stays empty.
pub fn ensure_gzip(data: Vec<u8>) -> Result<Vec<u8>, GeneratorError> {
    if data.is_empty() || is_gzip(&data) {
        Ok(data)
    } else {
        gzip(&data)
    }
}
