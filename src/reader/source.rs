//! File opening and text decoding
//!
//! SimaPro writes Windows-1252 by default, but files saved by other tools
//! are often UTF-8 with or without a byte order mark.

use crate::error::{Result, SimaProError};
use encoding_rs::WINDOWS_1252;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode raw bytes: UTF-8 when valid, Windows-1252 otherwise
pub fn decode_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Input is not valid UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Read and decode a SimaPro CSV file
pub fn read_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| SimaProError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(decode_bytes(&bytes))
}
