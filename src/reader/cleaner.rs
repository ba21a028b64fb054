//! Cell cleaning for raw SimaPro fields
//!
//! SimaPro writes the delete character where a cell holds a line break, and
//! exports that pass through other tools often pick up undefined Windows-1252
//! bytes, stray control characters, or double-encoded UTF-8.

use encoding_rs::WINDOWS_1252;
use tracing::debug;

/// Bytes with no assigned character in Windows-1252
const UNDEFINED_CHARS: [char; 5] = ['\u{81}', '\u{8d}', '\u{8f}', '\u{90}', '\u{9d}'];

/// Characters that usually mean UTF-8 text was decoded as Windows-1252
const MOJIBAKE_MARKERS: [char; 6] = ['Ã', 'Â', '€', '˜', 'â', '¿'];

/// Clean a single field
pub fn clean_cell(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter_map(|c| match c {
            '\u{7f}' => Some('\n'),
            '\t' | '\n' => Some(c),
            c if UNDEFINED_CHARS.contains(&c) => None,
            c if (c as u32) < 0x20 => None,
            c => Some(c),
        })
        .collect();

    let repaired = if cleaned.chars().any(|c| MOJIBAKE_MARKERS.contains(&c)) {
        repair_mojibake(&cleaned).unwrap_or(cleaned)
    } else {
        cleaned
    };

    repaired.trim().to_string()
}

/// Undo one round of UTF-8-read-as-Windows-1252
///
/// Returns `None` when the text can't be re-encoded or the bytes aren't
/// valid UTF-8, which means it wasn't mojibake after all.
fn repair_mojibake(text: &str) -> Option<String> {
    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return None;
    }
    let fixed = String::from_utf8(bytes.into_owned()).ok()?;
    if fixed != text {
        debug!("Repaired encoding: '{}' -> '{}'", text, fixed);
    }
    Some(fixed)
}
