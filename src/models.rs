//! Core data structures for parsed SimaPro CSV exports.
//!
//! Defines raw rows, the block model, process sub-records (exchanges,
//! parameters, waste fractions), and the metadata value types shared by
//! the key/value blocks.

use crate::uncertainty::UncertaintyDistribution;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One input line after delimiter splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line_no: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line_no: usize, fields: Vec<String>) -> Self {
        Self { line_no, fields }
    }

    /// True when the row has no fields or only empty ones
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|field| field.is_empty())
    }

    /// Field at `index`, or `""` when the row is shorter
    pub fn get(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn first(&self) -> &str {
        self.get(0)
    }

    /// Non-empty fields from `start` onwards
    pub fn non_empty_from(&self, start: usize) -> Vec<&str> {
        self.fields
            .iter()
            .skip(start)
            .map(String::as_str)
            .filter(|field| !field.is_empty())
            .collect()
    }
}

/// Inclusive range of source lines a block was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// Declared kind of export, from the header preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    Processes,
    Methods,
    ProductStages,
}

impl ExportKind {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "processes" => Some(Self::Processes),
            "methods" => Some(Self::Methods),
            "product stages" => Some(Self::ProductStages),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Processes => "processes",
            Self::Methods => "methods",
            Self::ProductStages => "product stages",
        }
    }

    /// Inventory exports carry processes and need parameter resolution
    pub fn has_inventory(&self) -> bool {
        matches!(self, Self::Processes | Self::ProductStages)
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Key/value metadata
// =============================================================================

/// Reference from a process to a `Literature reference` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteratureLink {
    pub reference: String,
    pub comment: Option<String>,
    /// Fields of the matching literature block, filled in after parsing
    pub resolved: Option<Metadata>,
}

/// Value side of a key/value pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
    Boolean(bool),
    Date(NaiveDate),
    References(Vec<LiteratureLink>),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// Ordered key/value pairs; later inserts replace earlier ones in place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub Vec<(String, MetadataValue)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MetadataValue> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_text)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, MetadataValue)> {
        self.0.iter()
    }
}

// =============================================================================
// Process sub-records
// =============================================================================

/// Raw uncertainty cells, held until an amount is final
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUncertainty {
    pub kind: String,
    pub field1: String,
    pub field2: String,
    pub field3: String,
}

/// Audit record written by unit normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub original_unit: String,
    pub factor: f64,
}

/// One technosphere, biosphere, product or waste edge of a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub name: String,
    pub unit: String,
    /// Literal amount, or the evaluated formula once parameters are resolved
    pub amount: f64,
    pub formula: Option<String>,
    pub original_formula: Option<String>,
    /// Formula that divided by zero; `amount` was forced to zero
    pub zero_division_formula: Option<String>,
    pub allocation: Option<f64>,
    pub allocation_formula: Option<String>,
    pub original_allocation_formula: Option<String>,
    pub raw_uncertainty: Option<RawUncertainty>,
    pub uncertainty: Option<UncertaintyDistribution>,
    pub waste_type: Option<String>,
    pub category: Option<String>,
    /// Biosphere context: section label and subcompartment
    pub context: Option<(String, String)>,
    pub cas_number: Option<String>,
    pub comment: String,
    pub unit_conversion: Option<UnitConversion>,
    pub line_no: usize,
}

impl Exchange {
    /// Edge with every optional field empty
    pub fn new(name: impl Into<String>, unit: impl Into<String>, line_no: usize) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            amount: 0.0,
            formula: None,
            original_formula: None,
            zero_division_formula: None,
            allocation: None,
            allocation_formula: None,
            original_allocation_formula: None,
            raw_uncertainty: None,
            uncertainty: None,
            waste_type: None,
            category: None,
            context: None,
            cas_number: None,
            comment: String::new(),
            unit_conversion: None,
            line_no,
        }
    }
}

/// Input or calculated parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Scope-prefixed, uppercased alias once resolution has run
    pub name: String,
    pub original_name: String,
    pub amount: f64,
    pub formula: Option<String>,
    pub original_formula: Option<String>,
    pub zero_division_formula: Option<String>,
    pub uncertainty: Option<UncertaintyDistribution>,
    pub hidden: bool,
    pub comment: String,
    pub line_no: usize,
}

impl ParameterRecord {
    pub fn is_calculated(&self) -> bool {
        self.formula.is_some() || self.zero_division_formula.is_some()
    }
}

/// `Separated waste` / `Remaining waste` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteFraction {
    pub waste_treatment: String,
    pub waste_type: String,
    /// Percentage of the waste type sent to this treatment
    pub amount: f64,
    pub comment: Option<String>,
    pub line_no: usize,
}

/// Named section inside a `Process` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessSection {
    AvoidedProducts,
    CalculatedParameters,
    EconomicIssues,
    ElectricityHeat,
    EmissionsToAir,
    EmissionsToSoil,
    EmissionsToWater,
    FinalWasteFlows,
    InputParameters,
    MaterialsFuels,
    NonMaterialEmissions,
    Products,
    RemainingWaste,
    Resources,
    SeparatedWaste,
    SocialIssues,
    WasteScenario,
    WasteToTreatment,
    WasteTreatment,
}

/// Row layout shared by groups of process sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLayout {
    Products,
    Technosphere,
    Biosphere,
    WasteTreatment,
    WasteFractions,
    InputParameters,
    CalculatedParameters,
}

impl ProcessSection {
    pub const ALL: [ProcessSection; 19] = [
        Self::AvoidedProducts,
        Self::CalculatedParameters,
        Self::EconomicIssues,
        Self::ElectricityHeat,
        Self::EmissionsToAir,
        Self::EmissionsToSoil,
        Self::EmissionsToWater,
        Self::FinalWasteFlows,
        Self::InputParameters,
        Self::MaterialsFuels,
        Self::NonMaterialEmissions,
        Self::Products,
        Self::RemainingWaste,
        Self::Resources,
        Self::SeparatedWaste,
        Self::SocialIssues,
        Self::WasteScenario,
        Self::WasteToTreatment,
        Self::WasteTreatment,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AvoidedProducts => "Avoided products",
            Self::CalculatedParameters => "Calculated parameters",
            Self::EconomicIssues => "Economic issues",
            Self::ElectricityHeat => "Electricity/heat",
            Self::EmissionsToAir => "Emissions to air",
            Self::EmissionsToSoil => "Emissions to soil",
            Self::EmissionsToWater => "Emissions to water",
            Self::FinalWasteFlows => "Final waste flows",
            Self::InputParameters => "Input parameters",
            Self::MaterialsFuels => "Materials/fuels",
            Self::NonMaterialEmissions => "Non material emissions",
            Self::Products => "Products",
            Self::RemainingWaste => "Remaining waste",
            Self::Resources => "Resources",
            Self::SeparatedWaste => "Separated waste",
            Self::SocialIssues => "Social issues",
            Self::WasteScenario => "Waste scenario",
            Self::WasteToTreatment => "Waste to treatment",
            Self::WasteTreatment => "Waste treatment",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.label() == label)
    }

    pub fn layout(&self) -> SectionLayout {
        match self {
            Self::Products => SectionLayout::Products,
            Self::AvoidedProducts
            | Self::ElectricityHeat
            | Self::MaterialsFuels
            | Self::WasteToTreatment => SectionLayout::Technosphere,
            Self::EconomicIssues
            | Self::EmissionsToAir
            | Self::EmissionsToSoil
            | Self::EmissionsToWater
            | Self::FinalWasteFlows
            | Self::NonMaterialEmissions
            | Self::Resources
            | Self::SocialIssues => SectionLayout::Biosphere,
            Self::WasteTreatment | Self::WasteScenario => SectionLayout::WasteTreatment,
            Self::SeparatedWaste | Self::RemainingWaste => SectionLayout::WasteFractions,
            Self::InputParameters => SectionLayout::InputParameters,
            Self::CalculatedParameters => SectionLayout::CalculatedParameters,
        }
    }
}

impl fmt::Display for ProcessSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parsed body of one process section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Section {
    Exchanges(Vec<Exchange>),
    Parameters(Vec<ParameterRecord>),
    WasteFractions(Vec<WasteFraction>),
}

impl Section {
    pub fn len(&self) -> usize {
        match self {
            Self::Exchanges(rows) => rows.len(),
            Self::Parameters(rows) => rows.len(),
            Self::WasteFractions(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Life cycle inventory process with metadata and sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub metadata: Metadata,
    pub sections: BTreeMap<ProcessSection, Section>,
    pub line_no: usize,
}

impl Process {
    pub fn exchanges(&self, section: ProcessSection) -> &[Exchange] {
        match self.sections.get(&section) {
            Some(Section::Exchanges(rows)) => rows,
            _ => &[],
        }
    }

    pub fn exchanges_mut(&mut self, section: ProcessSection) -> Option<&mut Vec<Exchange>> {
        match self.sections.get_mut(&section) {
            Some(Section::Exchanges(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn parameters(&self, section: ProcessSection) -> &[ParameterRecord] {
        match self.sections.get(&section) {
            Some(Section::Parameters(rows)) => rows,
            _ => &[],
        }
    }

    /// Every exchange in every section, in section order
    pub fn all_exchanges_mut(&mut self) -> impl Iterator<Item = &mut Exchange> {
        self.sections
            .values_mut()
            .filter_map(|section| match section {
                Section::Exchanges(rows) => Some(rows.iter_mut()),
                _ => None,
            })
            .flatten()
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.get_text("Process name")
    }
}

// =============================================================================
// Top-level block records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub name: String,
    pub dimension: String,
    /// Factor to the reference unit
    pub conversion: f64,
    pub reference_unit_name: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub name: String,
    pub has_dimension: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterizationFactor {
    pub context: (String, String),
    pub name: String,
    pub cas_number: Option<String>,
    pub factor: f64,
    pub unit: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactCategory {
    pub name: String,
    pub unit: String,
    pub factors: Vec<CharacterizationFactor>,
}

/// Name and factor pair used by damage categories and normalization sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCategory {
    pub name: String,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageCategory {
    pub name: String,
    pub unit: String,
    pub impact_categories: Vec<WeightedCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationWeightingSet {
    pub name: String,
    pub normalization: Vec<WeightedCategory>,
    pub weighting: Vec<WeightedCategory>,
}

/// Entry of a trailing flow list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    pub unit: String,
    pub cas_number: Option<String>,
    pub comment: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowList {
    /// Block keyword, e.g. `Airborne emissions`
    pub category: String,
    pub flows: Vec<FlowDefinition>,
}

/// Parsed content of a top-level block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockData {
    Units(Vec<UnitDefinition>),
    Quantities(Vec<Quantity>),
    LiteratureReference(Metadata),
    Method(Metadata),
    ImpactCategory(ImpactCategory),
    DamageCategory(DamageCategory),
    NormalizationWeightingSet(NormalizationWeightingSet),
    DatabaseInputParameters(Vec<ParameterRecord>),
    ProjectInputParameters(Vec<ParameterRecord>),
    DatabaseCalculatedParameters(Vec<ParameterRecord>),
    ProjectCalculatedParameters(Vec<ParameterRecord>),
    Process(Box<Process>),
    /// Kept as raw rows; no structural parser exists for product stages
    ProductStage(Vec<RawRow>),
    SystemDescription(Metadata),
    FlowList(FlowList),
}

impl BlockData {
    /// Short label used in summaries
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Units(_) => "Units",
            Self::Quantities(_) => "Quantities",
            Self::LiteratureReference(_) => "Literature reference",
            Self::Method(_) => "Method",
            Self::ImpactCategory(_) => "Impact category",
            Self::DamageCategory(_) => "Damage category",
            Self::NormalizationWeightingSet(_) => "Normalization-Weighting set",
            Self::DatabaseInputParameters(_) => "Database Input parameters",
            Self::ProjectInputParameters(_) => "Project Input parameters",
            Self::DatabaseCalculatedParameters(_) => "Database Calculated parameters",
            Self::ProjectCalculatedParameters(_) => "Project Calculated parameters",
            Self::Process(_) => "Process",
            Self::ProductStage(_) => "Product stage",
            Self::SystemDescription(_) => "System description",
            Self::FlowList(_) => "Flow list",
        }
    }
}

/// A parsed block with the lines it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub span: LineSpan,
    pub data: BlockData,
}

impl Block {
    pub fn as_process(&self) -> Option<&Process> {
        match &self.data {
            BlockData::Process(process) => Some(process),
            _ => None,
        }
    }

    pub fn as_process_mut(&mut self) -> Option<&mut Process> {
        match &mut self.data {
            BlockData::Process(process) => Some(process),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_accessors() {
        let row = RawRow::new(3, vec!["a".to_string(), String::new(), "c".to_string()]);
        assert_eq!(row.first(), "a");
        assert_eq!(row.get(7), "");
        assert_eq!(row.non_empty_from(1), vec!["c"]);
        assert!(!row.is_blank());
        assert!(RawRow::new(4, vec![String::new()]).is_blank());
        assert!(RawRow::new(5, vec![]).is_blank());
    }

    #[test]
    fn test_process_section_labels_round_trip() {
        for section in ProcessSection::ALL {
            assert_eq!(ProcessSection::from_label(section.label()), Some(section));
        }
        assert_eq!(ProcessSection::from_label("Airborne emissions"), None);
    }

    #[test]
    fn test_metadata_insert_replaces() {
        let mut metadata = Metadata::new();
        metadata.insert("Name", MetadataValue::Text("a".to_string()));
        metadata.insert("Other", MetadataValue::Boolean(true));
        metadata.insert("Name", MetadataValue::Text("b".to_string()));
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get_text("Name"), Some("b"));
        assert_eq!(metadata.get("Other").and_then(MetadataValue::as_bool), Some(true));
    }

    #[test]
    fn test_export_kind_labels() {
        assert_eq!(ExportKind::from_label("product stages"), Some(ExportKind::ProductStages));
        assert_eq!(ExportKind::from_label("Processes"), None);
        assert!(ExportKind::Processes.has_inventory());
        assert!(!ExportKind::Methods.has_inventory());
    }
}
