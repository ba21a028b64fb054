//! Process section rows and trailing flow lists.
//!
//! Amount cells holding a plain number become `amount`; anything else is
//! kept as a formula for the parameter resolver. Uncertainty cells are
//! stored raw because a distribution needs the final amount.

use crate::blocks::fields::{AmountOrFormula, NumberFormat, skip_empty};
use crate::cas::validate_cas;
use crate::error::Result;
use crate::models::{Exchange, FlowDefinition, RawRow, RawUncertainty, WasteFraction};

fn set_amount(exchange: &mut Exchange, value: AmountOrFormula) {
    match value {
        AmountOrFormula::Amount(amount) => exchange.amount = amount,
        AmountOrFormula::Formula(formula) => exchange.formula = Some(formula),
    }
}

fn raw_uncertainty(row: &RawRow, start: usize) -> RawUncertainty {
    RawUncertainty {
        kind: row.get(start).to_string(),
        field1: row.get(start + 1).to_string(),
        field2: row.get(start + 2).to_string(),
        field3: row.get(start + 3).to_string(),
    }
}

fn optional_text(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// `name; unit; amount|formula; allocation|formula; waste type; category; comment`
pub fn parse_products(rows: &[RawRow], numbers: &NumberFormat) -> Result<Vec<Exchange>> {
    skip_empty(rows)
        .map(|row| {
            let mut exchange = Exchange::new(row.get(0), row.get(1), row.line_no);
            set_amount(
                &mut exchange,
                numbers.amount_or_formula(row.get(2), "product amount", row.line_no)?,
            );
            if !row.get(3).is_empty() {
                match numbers.amount_or_formula(row.get(3), "allocation", row.line_no)? {
                    AmountOrFormula::Amount(allocation) => exchange.allocation = Some(allocation),
                    AmountOrFormula::Formula(formula) => exchange.allocation_formula = Some(formula),
                }
            }
            exchange.waste_type = optional_text(row.get(4));
            exchange.category = optional_text(row.get(5));
            exchange.comment = row.get(6).to_string();
            Ok(exchange)
        })
        .collect()
}

/// `name; unit; amount|formula; kind; s1; s2; s3; comment`
pub fn parse_technosphere(rows: &[RawRow], numbers: &NumberFormat) -> Result<Vec<Exchange>> {
    skip_empty(rows)
        .map(|row| {
            let mut exchange = Exchange::new(row.get(0), row.get(1), row.line_no);
            set_amount(
                &mut exchange,
                numbers.amount_or_formula(row.get(2), "amount", row.line_no)?,
            );
            exchange.raw_uncertainty = Some(raw_uncertainty(row, 3));
            exchange.comment = row.get(7).to_string();
            Ok(exchange)
        })
        .collect()
}

/// `name; subcompartment; unit; amount|formula; kind; s1; s2; s3; comment`
///
/// The context pairs the section label with the subcompartment.
pub fn parse_biosphere(
    rows: &[RawRow],
    section_label: &str,
    numbers: &NumberFormat,
) -> Result<Vec<Exchange>> {
    skip_empty(rows)
        .map(|row| {
            let mut exchange = Exchange::new(row.get(0), row.get(2), row.line_no);
            exchange.context = Some((section_label.to_string(), row.get(1).to_string()));
            set_amount(
                &mut exchange,
                numbers.amount_or_formula(row.get(3), "amount", row.line_no)?,
            );
            exchange.raw_uncertainty = Some(raw_uncertainty(row, 4));
            exchange.comment = row.get(8).to_string();
            Ok(exchange)
        })
        .collect()
}

/// `name; unit; amount; waste type; category; comment`
pub fn parse_waste_treatment(rows: &[RawRow], numbers: &NumberFormat) -> Result<Vec<Exchange>> {
    skip_empty(rows)
        .map(|row| {
            let mut exchange = Exchange::new(row.get(0), row.get(1), row.line_no);
            exchange.amount = numbers.require(row.get(2), "waste amount", row.line_no)?;
            exchange.waste_type = optional_text(row.get(3));
            exchange.category = optional_text(row.get(4));
            exchange.comment = row.get(5).to_string();
            Ok(exchange)
        })
        .collect()
}

/// `treatment; waste type; percentage; comment`
pub fn parse_waste_fractions(rows: &[RawRow], numbers: &NumberFormat) -> Result<Vec<WasteFraction>> {
    skip_empty(rows)
        .map(|row| {
            Ok(WasteFraction {
                waste_treatment: row.get(0).to_string(),
                waste_type: row.get(1).to_string(),
                amount: numbers.require(row.get(2), "waste fraction", row.line_no)?,
                comment: optional_text(row.get(3)),
                line_no: row.line_no,
            })
        })
        .collect()
}

/// Trailing flow list rows of `name; unit; CAS; comment`
pub fn parse_flow_definitions(rows: &[RawRow]) -> Vec<FlowDefinition> {
    skip_empty(rows)
        .map(|row| FlowDefinition {
            name: row.get(0).to_string(),
            unit: row.get(1).to_string(),
            cas_number: validate_cas(row.get(2)),
            comment: row.get(3).to_string(),
            line_no: row.line_no,
        })
        .collect()
}
