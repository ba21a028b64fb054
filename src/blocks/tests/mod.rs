//! Test utilities for block parser testing
//!
//! Fixtures are written as `;`-separated text, one row per line, with line
//! numbers starting at 1.

use crate::blocks::BlockContext;
use crate::models::RawRow;

mod impact_tests;

/// Split fixture text into rows the way the reader would
pub fn rows(text: &str) -> Vec<RawRow> {
    rows_from(text, 1)
}

/// Same as [`rows`], numbering from `first_line_no`
pub fn rows_from(text: &str, first_line_no: usize) -> Vec<RawRow> {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let fields = if line.trim().is_empty() {
                Vec::new()
            } else {
                line.split(';').map(|field| field.trim().to_string()).collect()
            };
            RawRow::new(first_line_no + i, fields)
        })
        .collect()
}

/// Context with `.` as decimal separator and month-first dates
pub fn dot_context() -> BlockContext {
    BlockContext::new('.', false).unwrap()
}

/// Context with `,` as decimal separator and day-first dates
pub fn comma_context() -> BlockContext {
    BlockContext::new(',', true).unwrap()
}
