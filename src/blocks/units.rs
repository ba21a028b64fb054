//! `Units` and `Quantities` blocks.

use crate::blocks::fields::{NumberFormat, require_boolean, skip_empty};
use crate::error::Result;
use crate::models::{Quantity, RawRow, UnitDefinition};

/// Rows of `name; dimension; conversion factor; reference unit`
pub fn parse_units(rows: &[RawRow], numbers: &NumberFormat) -> Result<Vec<UnitDefinition>> {
    skip_empty(rows)
        .map(|row| {
            Ok(UnitDefinition {
                name: row.get(0).to_string(),
                dimension: row.get(1).to_string(),
                conversion: numbers.require(row.get(2), "unit conversion factor", row.line_no)?,
                reference_unit_name: row.get(3).to_string(),
                line_no: row.line_no,
            })
        })
        .collect()
}

/// Rows of `name; has dimension`
pub fn parse_quantities(rows: &[RawRow]) -> Result<Vec<Quantity>> {
    skip_empty(rows)
        .map(|row| {
            Ok(Quantity {
                name: row.get(0).to_string(),
                has_dimension: require_boolean(row.get(1), row.line_no)?,
            })
        })
        .collect()
}
