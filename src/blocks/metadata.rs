//! Key/value blocks: `Literature reference`, `System description`, `Method`.
//!
//! All three are alternating `key` / value rows separated by blank lines.

use crate::blocks::fields::{alternating_key_value, as_boolean_or_text};
use crate::models::{Metadata, MetadataValue, RawRow};

pub fn parse_literature_reference(rows: &[RawRow]) -> Metadata {
    alternating_key_value(rows)
}

pub fn parse_system_description(rows: &[RawRow]) -> Metadata {
    alternating_key_value(rows)
}

/// Method settings; text values that are boolean tokens become booleans
pub fn parse_method(rows: &[RawRow]) -> Metadata {
    let Metadata(pairs) = alternating_key_value(rows);
    Metadata(
        pairs
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    MetadataValue::Text(text) => as_boolean_or_text(&text),
                    other => other,
                };
                (key, value)
            })
            .collect(),
    )
}
