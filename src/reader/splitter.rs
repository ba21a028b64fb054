//! Delimiter-aware row splitting
//!
//! Body text is split one physical line at a time so blank lines survive as
//! empty rows; block parsing depends on them. Lines with quotes go through
//! the `csv` crate so quoted cells with embedded delimiters stay whole, and a
//! quoted cell that spans several lines is joined before parsing.

use crate::constants::USUAL_DELIMITERS;
use crate::error::{Result, SimaProError};
use crate::models::RawRow;
use csv::StringRecord;
use tracing::warn;

/// Check that a declared delimiter can drive the csv reader
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        return Err(SimaProError::UnsupportedDelimiter {
            delimiter: delimiter.to_string(),
        });
    }
    if !USUAL_DELIMITERS.contains(&delimiter) {
        warn!("SimaPro CSV file uses unusual delimiter '{}'", delimiter);
    }
    Ok(delimiter as u8)
}

/// Split body text into rows, numbering lines from `first_line_no`
pub fn split_rows(body: &str, delimiter: char, first_line_no: usize) -> Result<Vec<RawRow>> {
    let delimiter_byte = delimiter_byte(delimiter)?;

    let mut rows = Vec::new();
    let mut pending = String::new();
    let mut pending_start = first_line_no;

    for (index, line) in body.lines().enumerate() {
        let line_no = first_line_no + index;

        if pending.is_empty() {
            if line.trim().is_empty() {
                rows.push(RawRow::new(line_no, Vec::new()));
                continue;
            }
            pending_start = line_no;
            pending.push_str(line);
        } else {
            pending.push('\n');
            pending.push_str(line);
        }

        if ends_inside_quotes(&pending, delimiter) {
            continue;
        }

        let fields = split_line(&pending, delimiter, delimiter_byte, pending_start)?;
        rows.push(RawRow::new(pending_start, fields));
        pending.clear();
    }

    if !pending.is_empty() {
        warn!("Unterminated quoted cell starting on line {}", pending_start);
        let fields = split_line(&pending, delimiter, delimiter_byte, pending_start)?;
        rows.push(RawRow::new(pending_start, fields));
    }

    Ok(rows)
}

/// True when `text` ends inside a quoted cell
///
/// A quote only opens a quoted cell at the start of a field; anywhere else
/// it is a literal character. Inside a quoted cell `""` is an escaped quote.
fn ends_inside_quotes(text: &str, delimiter: char) -> bool {
    let mut inside = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if inside {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    inside = false;
                }
            }
        } else if c == '"' && at_field_start {
            inside = true;
        }
        at_field_start = !inside && c == delimiter;
    }
    inside
}

fn split_line(line: &str, delimiter: char, delimiter_byte: u8, line_no: usize) -> Result<Vec<String>> {
    if !line.contains('"') {
        return Ok(line.split(delimiter).map(str::to_string).collect());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut fields = Vec::new();
    let mut records = 0;
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                fields.extend(record.iter().map(str::to_string));
                records += 1;
            }
            Ok(false) => break,
            Err(source) => return Err(SimaProError::RowSplit { line_no, source }),
        }
    }
    if records > 1 {
        warn!(
            "Line {} split into {} records; keeping their cells as one row",
            line_no, records
        );
    }
    Ok(fields)
}
