//! Structural parsers for SimaPro CSV blocks
//!
//! Every parser maps the body rows of one block (the keyword row is already
//! consumed by the segmenter) to typed records, skipping blank rows.
//!
//! ## Architecture
//!
//! - [`fields`] - Number, boolean and date conversion plus row grouping
//! - [`units`] - `Units` and `Quantities`
//! - [`metadata`] - Key/value blocks: literature references, system
//!   descriptions and methods
//! - [`impact`] - Impact categories, damage categories and
//!   normalization-weighting sets
//! - [`parameters`] - Input and calculated parameters
//! - [`exchanges`] - Process section rows and trailing flow lists
//! - [`process`] - The two-phase `Process` parser

pub mod exchanges;
pub mod fields;
pub mod impact;
pub mod metadata;
pub mod parameters;
pub mod process;
pub mod units;

#[cfg(test)]
mod tests;

pub use fields::{AmountOrFormula, NumberFormat};

use crate::constants::{CONTROL_BLOCK_KEYWORDS, INDETERMINATE_BLOCK_KEYWORDS};
use crate::error::Result;
use crate::header::Header;
use crate::models::{BlockData, FlowList, RawRow};

/// Top-level block kinds, keyed by their header keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    DatabaseCalculatedParameters,
    DatabaseInputParameters,
    LiteratureReference,
    ProjectInputParameters,
    ProjectCalculatedParameters,
    Quantities,
    ProductStage,
    Units,
    Process,
    Method,
    ImpactCategory,
    NormalizationWeightingSet,
    DamageCategory,
    SystemDescription,
    /// Trailing flow list, with its category keyword
    FlowList(&'static str),
}

impl BlockKind {
    /// Look up a keyword in the control and trailing catalogs
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword {
            "Database Calculated parameters" => Self::DatabaseCalculatedParameters,
            "Database Input parameters" => Self::DatabaseInputParameters,
            "Literature reference" => Self::LiteratureReference,
            "Project Input parameters" => Self::ProjectInputParameters,
            "Project Calculated parameters" => Self::ProjectCalculatedParameters,
            "Quantities" => Self::Quantities,
            "Product stage" => Self::ProductStage,
            "Units" => Self::Units,
            "Process" => Self::Process,
            "Method" => Self::Method,
            "Impact category" => Self::ImpactCategory,
            "Normalization-Weighting set" => Self::NormalizationWeightingSet,
            "Damage category" => Self::DamageCategory,
            "System description" => Self::SystemDescription,
            other => {
                let category = INDETERMINATE_BLOCK_KEYWORDS
                    .iter()
                    .find(|keyword| **keyword == other)?;
                Self::FlowList(*category)
            }
        };
        Some(kind)
    }

    /// Trailing-catalog kinds double as process section names
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::SystemDescription | Self::FlowList(_))
    }
}

/// True for keywords of the control catalog
pub fn is_control_keyword(keyword: &str) -> bool {
    CONTROL_BLOCK_KEYWORDS.contains(&keyword)
}

/// Export-wide settings every block parser needs
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub numbers: NumberFormat,
    pub dayfirst: bool,
}

impl BlockContext {
    pub fn new(decimal_separator: char, dayfirst: bool) -> Result<Self> {
        Ok(Self {
            numbers: NumberFormat::new(decimal_separator)?,
            dayfirst,
        })
    }

    pub fn from_header(header: &Header) -> Result<Self> {
        Self::new(header.decimal_separator, header.dayfirst)
    }
}

/// Parse the body rows of one block
pub fn parse_block(kind: BlockKind, rows: &[RawRow], context: &BlockContext) -> Result<BlockData> {
    let numbers = &context.numbers;
    let data = match kind {
        BlockKind::DatabaseCalculatedParameters => {
            BlockData::DatabaseCalculatedParameters(parameters::parse_calculated(rows, numbers))
        }
        BlockKind::ProjectCalculatedParameters => {
            BlockData::ProjectCalculatedParameters(parameters::parse_calculated(rows, numbers))
        }
        BlockKind::DatabaseInputParameters => {
            BlockData::DatabaseInputParameters(parameters::parse_input(rows, numbers)?)
        }
        BlockKind::ProjectInputParameters => {
            BlockData::ProjectInputParameters(parameters::parse_input(rows, numbers)?)
        }
        BlockKind::LiteratureReference => {
            BlockData::LiteratureReference(metadata::parse_literature_reference(rows))
        }
        BlockKind::SystemDescription => {
            BlockData::SystemDescription(metadata::parse_system_description(rows))
        }
        BlockKind::Method => BlockData::Method(metadata::parse_method(rows)),
        BlockKind::Quantities => BlockData::Quantities(units::parse_quantities(rows)?),
        BlockKind::Units => BlockData::Units(units::parse_units(rows, numbers)?),
        BlockKind::ProductStage => {
            BlockData::ProductStage(fields::skip_empty(rows).cloned().collect())
        }
        BlockKind::Process => BlockData::Process(Box::new(process::parse_process(rows, context)?)),
        BlockKind::ImpactCategory => {
            BlockData::ImpactCategory(impact::parse_impact_category(rows, numbers)?)
        }
        BlockKind::DamageCategory => {
            BlockData::DamageCategory(impact::parse_damage_category(rows, numbers)?)
        }
        BlockKind::NormalizationWeightingSet => BlockData::NormalizationWeightingSet(
            impact::parse_normalization_weighting_set(rows, numbers)?,
        ),
        BlockKind::FlowList(category) => BlockData::FlowList(FlowList {
            category: category.to_string(),
            flows: exchanges::parse_flow_definitions(rows),
        }),
    };
    Ok(data)
}
