//! Impact assessment blocks.
//!
//! `Impact category` and `Damage category` start with a `name; unit` row
//! followed by one keyword section (`Substances` or `Impact categories`).
//! A `Normalization-Weighting set` has a name row and then `Normalization`
//! and/or `Weighting` sections. Blank rows inside sections are ignored.

use crate::blocks::fields::{NumberFormat, jump_to_nonempty, skip_empty};
use crate::cas::validate_cas;
use crate::error::{Result, SimaProError};
use crate::models::{
    CharacterizationFactor, DamageCategory, ImpactCategory, NormalizationWeightingSet, RawRow,
    WeightedCategory,
};

/// First non-blank row and everything after it
fn definition_row<'a>(rows: &'a [RawRow], block: &str) -> Result<(&'a RawRow, &'a [RawRow])> {
    match jump_to_nonempty(rows) {
        [first, rest @ ..] => Ok((first, rest)),
        [] => Err(SimaProError::malformed_block(
            block,
            rows.first().map_or(0, |row| row.line_no),
            "missing definition row",
        )),
    }
}

/// Non-blank rows after a lone `keyword` row
fn expected_section<'a>(rows: &'a [RawRow], keyword: &str, block: &str) -> Result<Vec<&'a RawRow>> {
    match jump_to_nonempty(rows) {
        [] => Ok(Vec::new()),
        [first, body @ ..] if first.first() == keyword && first.non_empty_from(1).is_empty() => {
            Ok(skip_empty(body).collect())
        }
        [first, ..] => Err(SimaProError::malformed_block(
            block,
            first.line_no,
            format!("expected '{}' section, found '{}'", keyword, first.fields.join(";")),
        )),
    }
}

fn weighted<'a>(
    rows: impl IntoIterator<Item = &'a RawRow>,
    numbers: &NumberFormat,
) -> Result<Vec<WeightedCategory>> {
    rows.into_iter()
        .map(|row| {
            Ok(WeightedCategory {
                name: row.get(0).to_string(),
                factor: numbers.require(row.get(1), "factor", row.line_no)?,
            })
        })
        .collect()
}

pub fn parse_impact_category(rows: &[RawRow], numbers: &NumberFormat) -> Result<ImpactCategory> {
    let block = "Impact category";
    let (definition, rest) = definition_row(rows, block)?;
    let substances = expected_section(rest, "Substances", block)?;

    let factors = substances
        .iter()
        .map(|row| {
            Ok(CharacterizationFactor {
                context: (row.get(0).to_string(), row.get(1).to_string()),
                name: row.get(2).to_string(),
                cas_number: validate_cas(row.get(3)),
                factor: numbers.require(row.get(4), "characterization factor", row.line_no)?,
                unit: row.get(5).to_string(),
                line_no: row.line_no,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ImpactCategory {
        name: definition.get(0).to_string(),
        unit: definition.get(1).to_string(),
        factors,
    })
}

pub fn parse_damage_category(rows: &[RawRow], numbers: &NumberFormat) -> Result<DamageCategory> {
    let block = "Damage category";
    let (definition, rest) = definition_row(rows, block)?;
    let impact_rows = expected_section(rest, "Impact categories", block)?;

    Ok(DamageCategory {
        name: definition.get(0).to_string(),
        unit: definition.get(1).to_string(),
        impact_categories: weighted(impact_rows, numbers)?,
    })
}

pub fn parse_normalization_weighting_set(
    rows: &[RawRow],
    numbers: &NumberFormat,
) -> Result<NormalizationWeightingSet> {
    let block = "Normalization-Weighting set";
    let (definition, rest) = definition_row(rows, block)?;

    let mut set = NormalizationWeightingSet {
        name: definition.get(0).to_string(),
        normalization: Vec::new(),
        weighting: Vec::new(),
    };

    let mut target: Option<&mut Vec<WeightedCategory>> = None;
    for row in skip_empty(rest) {
        match row.first() {
            "Normalization" => target = Some(&mut set.normalization),
            "Weighting" => target = Some(&mut set.weighting),
            _ => {
                let Some(factors) = target.as_deref_mut() else {
                    return Err(SimaProError::malformed_block(
                        block,
                        row.line_no,
                        "factor row before any 'Normalization' or 'Weighting' section",
                    ));
                };
                factors.extend(weighted([row], numbers)?);
            }
        }
    }

    Ok(set)
}
