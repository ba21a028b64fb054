//! The `Process` block parser.
//!
//! Parsing runs in two phases. Metadata comes first as `key` / value row
//! pairs, up to the first row naming a process section. The rest is a
//! series of keyword sections, each parsed with the row layout of its
//! section. The finished process is then checked for a consistent waste
//! treatment model.

use crate::blocks::BlockContext;
use crate::blocks::exchanges::{
    parse_biosphere, parse_products, parse_technosphere, parse_waste_fractions,
    parse_waste_treatment,
};
use crate::blocks::fields::{jump_to_nonempty, key_multiline_values, parse_date, require_boolean};
use crate::blocks::parameters::{parse_calculated, parse_input};
use crate::constants::{
    CATEGORY_TYPE_KEY, DATE_KEY, FIELD_JOINER, INFRASTRUCTURE_KEY, LITERATURE_REFERENCES_KEY,
    PROCESS_SECTION_KEYWORDS, WASTE_TREATMENT_CATEGORY,
};
use crate::error::{Result, SimaProError};
use crate::models::{
    LiteratureLink, Metadata, MetadataValue, Process, ProcessSection, RawRow, Section,
    SectionLayout,
};
use std::collections::BTreeMap;
use tracing::warn;

const BLOCK: &str = "Process";

fn is_section_row(row: &RawRow) -> bool {
    ProcessSection::from_label(row.first()).is_some() && row.non_empty_from(1).is_empty()
}

pub fn parse_process(rows: &[RawRow], context: &BlockContext) -> Result<Process> {
    let rows = jump_to_nonempty(rows);
    let line_no = rows.first().map_or(0, |row| row.line_no);

    let (metadata, consumed) = parse_metadata(rows, context.dayfirst)?;
    let sections = parse_sections(&rows[consumed..], context)?;

    let process = Process {
        metadata,
        sections,
        line_no,
    };
    check_waste_model(&process)?;
    Ok(process)
}

/// Read key/value pairs until the first section row
///
/// Returns the metadata and the number of rows consumed.
fn parse_metadata(rows: &[RawRow], dayfirst: bool) -> Result<(Metadata, usize)> {
    let mut metadata = Metadata::new();
    let mut index = 0;

    while index < rows.len() {
        let row = &rows[index];
        if row.is_blank() {
            index += 1;
            continue;
        }
        if is_section_row(row) {
            break;
        }

        let key = row.first().to_string();
        index += 1;

        if key == LITERATURE_REFERENCES_KEY {
            let mut links = Vec::new();
            while index < rows.len() && !rows[index].is_blank() {
                let reference_row = &rows[index];
                links.push(LiteratureLink {
                    reference: reference_row.get(0).to_string(),
                    comment: reference_row
                        .fields
                        .get(1)
                        .filter(|comment| !comment.is_empty())
                        .cloned(),
                    resolved: None,
                });
                index += 1;
            }
            if !links.is_empty() {
                metadata.insert(key, MetadataValue::References(links));
            }
            continue;
        }

        let Some(value_row) = rows.get(index).filter(|value_row| !value_row.is_blank()) else {
            continue;
        };
        index += 1;

        let value = if key == DATE_KEY {
            let text = value_row.first();
            match parse_date(text, dayfirst) {
                Some(date) => MetadataValue::Date(date),
                None => {
                    warn!(
                        "Can't parse process date '{}' on line {}; keeping it as text",
                        text, value_row.line_no
                    );
                    MetadataValue::Text(text.to_string())
                }
            }
        } else if key == INFRASTRUCTURE_KEY {
            MetadataValue::Boolean(require_boolean(value_row.first(), value_row.line_no)?)
        } else {
            MetadataValue::Text(value_row.non_empty_from(0).join(FIELD_JOINER))
        };
        metadata.insert(key, value);
    }

    Ok((metadata, index))
}

fn parse_sections(
    rows: &[RawRow],
    context: &BlockContext,
) -> Result<BTreeMap<ProcessSection, Section>> {
    let numbers = &context.numbers;
    let mut sections = BTreeMap::new();

    for keyword_section in key_multiline_values(rows, PROCESS_SECTION_KEYWORDS, BLOCK)? {
        let Some(kind) = ProcessSection::from_label(&keyword_section.keyword) else {
            return Err(SimaProError::malformed_block(
                BLOCK,
                keyword_section.line_no,
                format!("unknown process section '{}'", keyword_section.keyword),
            ));
        };
        let body = &keyword_section.rows;

        let section = match kind.layout() {
            SectionLayout::Products => Section::Exchanges(parse_products(body, numbers)?),
            SectionLayout::Technosphere => Section::Exchanges(parse_technosphere(body, numbers)?),
            SectionLayout::Biosphere => {
                Section::Exchanges(parse_biosphere(body, kind.label(), numbers)?)
            }
            SectionLayout::WasteTreatment => {
                Section::Exchanges(parse_waste_treatment(body, numbers)?)
            }
            SectionLayout::WasteFractions => {
                Section::WasteFractions(parse_waste_fractions(body, numbers)?)
            }
            SectionLayout::InputParameters => Section::Parameters(parse_input(body, numbers)?),
            SectionLayout::CalculatedParameters => {
                Section::Parameters(parse_calculated(body, numbers))
            }
        };

        if sections.insert(kind, section).is_some() {
            warn!(
                "Process section '{}' repeated on line {}; keeping the last one",
                kind, keyword_section.line_no
            );
        }
    }

    Ok(sections)
}

/// A process either produces products or treats waste, never both
fn check_waste_model(process: &Process) -> Result<()> {
    let waste_inputs = process.exchanges(ProcessSection::WasteTreatment).len();
    let products = process.exchanges(ProcessSection::Products).len();
    let category = process.metadata.get_text(CATEGORY_TYPE_KEY).unwrap_or("");

    let reason = if waste_inputs > 0 && products > 0 {
        format!(
            "can't model a process with {} waste treatment inputs and {} products",
            waste_inputs, products
        )
    } else if waste_inputs > 0 && category != WASTE_TREATMENT_CATEGORY {
        format!(
            "waste treatment processes need category type '{}', found '{}'",
            WASTE_TREATMENT_CATEGORY, category
        )
    } else if products > 0 && category == WASTE_TREATMENT_CATEGORY {
        format!(
            "processes with products can't have category type '{}'",
            WASTE_TREATMENT_CATEGORY
        )
    } else {
        return Ok(());
    };

    Err(SimaProError::WasteModelMismatch {
        line_no: process.line_no,
        reason,
    })
}
