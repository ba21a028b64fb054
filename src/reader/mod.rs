//! Input handling for SimaPro CSV files
//!
//! ## Architecture
//!
//! - [`source`] - File reading and Windows-1252 / UTF-8 decoding
//! - [`splitter`] - Delimiter-aware splitting of body lines into rows
//! - [`cleaner`] - Per-cell cleanup of control characters and mis-encodings
//! - [`rows`] - The row source with single-row pushback used by the segmenter

pub mod cleaner;
pub mod rows;
pub mod source;
pub mod splitter;

pub use cleaner::clean_cell;
pub use rows::RowSource;
pub use source::{decode_bytes, read_file};
pub use splitter::split_rows;

/// Split decoded text into its braced header lines and the remaining body
///
/// Header lines are the leading lines that start with `{` or `"{`.
pub fn split_preamble(text: &str) -> (Vec<&str>, &str) {
    let mut header = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if !(content.starts_with('{') || content.starts_with("\"{")) {
            break;
        }
        header.push(content);
        offset += line.len();
    }

    (header, &text[offset..])
}
