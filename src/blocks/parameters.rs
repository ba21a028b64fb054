//! Input and calculated parameter rows.
//!
//! Input parameters carry a literal value and uncertainty cells, so their
//! distribution is built right away. Calculated parameters hold a formula
//! that the resolver evaluates later.

use crate::blocks::fields::{NumberFormat, require_boolean, skip_empty};
use crate::error::Result;
use crate::models::{ParameterRecord, RawRow, RawUncertainty};
use crate::uncertainty::distribution;

/// Rows of `name; value; kind; s1; s2; s3; hidden; comment...`
pub fn parse_input(rows: &[RawRow], numbers: &NumberFormat) -> Result<Vec<ParameterRecord>> {
    skip_empty(rows)
        .map(|row| {
            let amount = numbers.require(row.get(1), "parameter value", row.line_no)?;
            let raw = RawUncertainty {
                kind: row.get(2).to_string(),
                field1: row.get(3).to_string(),
                field2: row.get(4).to_string(),
                field3: row.get(5).to_string(),
            };
            let uncertainty = distribution(amount, &raw, numbers, row.line_no)?;

            let hidden = match row.get(6) {
                "" => false,
                text => require_boolean(text, row.line_no)?,
            };

            Ok(ParameterRecord {
                name: row.get(0).to_string(),
                original_name: row.get(0).to_string(),
                amount,
                formula: None,
                original_formula: None,
                zero_division_formula: None,
                uncertainty: Some(uncertainty),
                hidden,
                comment: row.non_empty_from(7).join("\n"),
                line_no: row.line_no,
            })
        })
        .collect()
}

/// Rows of `name; formula; comment`
pub fn parse_calculated(rows: &[RawRow], numbers: &NumberFormat) -> Vec<ParameterRecord> {
    skip_empty(rows)
        .map(|row| ParameterRecord {
            name: row.get(0).to_string(),
            original_name: row.get(0).to_string(),
            amount: 0.0,
            formula: Some(numbers.normalize_formula(row.get(1))),
            original_formula: None,
            zero_division_formula: None,
            uncertainty: None,
            hidden: false,
            comment: row.get(2).to_string(),
            line_no: row.line_no,
        })
        .collect()
}
