//! Integration tests for parsing complete SimaPro CSV exports
//!
//! These tests run the whole pipeline through the public API: header,
//! segmentation, block parsing, parameter resolution, unit normalization
//! and the cross-block enrichment passes.

use encoding_rs::WINDOWS_1252;
use simapro_csv::models::{MetadataValue, UnitConversion};
use simapro_csv::{
    BlockData, ExportKind, ParseConfig, ParseSession, ProcessSection, SimaProCsv, SimaProError,
    UncertaintyDistribution,
};
use std::io::Write;
use tempfile::NamedTempFile;

const PROCESS_EXPORT: &str = r#"{SimaPro 9.5.0.1}
{processes}
{Date: 13.10.2023}
{Time: 14:02:11}
{Project: Test project}
{CSV Format version: 9.0.0}
{CSV separator: Semicolon}
{Decimal separator: ,}
{Date separator: .}
{Short date format: dd.MM.yyyy}

Literature reference

Name
Ecoinvent 3

Category
Ecoinvent

End

Units
kg;Mass;1;kg
g;Mass;0,001;kg
kWh;Energy;3,6;MJ
MJ;Energy;1;MJ
End

Quantities
Mass;Yes
Energy;Yes
End

Project Input parameters
share;0,5;Undefined;0;0;0;No;
End

Database Input parameters
factor;2;Lognormal;1,1;0;0;No;
End

Database Calculated parameters
total;share*factor*1000;
End

Process

Category type
material

Process name
Test process

Date
05.03.2021

Infrastructure
No

Literature references
Ecoinvent 3;main
Nowhere;

Products
Widget;kg;1;100;not defined;Others;

Materials/fuels
Steel;g;total;Normal;4;0;0;steel input
Copper;g;500;Triangular;0;400;600;

Electricity/heat
Electricity;kWh;"Iff(local>1; 2; 3)";Undefined;0;0;0;

Emissions to air
Carbon dioxide;;kg;0,5;Lognormal;1,2;0;0;

Input parameters
local;1,5;Undefined;0;0;0;No;

Calculated parameters
local_double;local*2;

End

Airborne emissions
Carbon dioxide;kg;124-38-9;fossil
End
"#;

fn approx(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

/// Test the full pipeline on a processes export with parameters and units
///
/// Purpose: Parse a realistic export end to end with default settings
/// Benefit: Catches breakage in how the pipeline stages hand data to each other
#[test]
fn test_process_export_end_to_end() {
    let parsed = SimaProCsv::parse_str(PROCESS_EXPORT, ParseConfig::default()).unwrap();

    assert_eq!(parsed.header.kind, ExportKind::Processes);
    assert_eq!(parsed.header.decimal_separator, ',');
    assert_eq!(parsed.database_name.as_deref(), Some("Test project"));

    let counts = parsed.block_counts();
    assert_eq!(counts.values().sum::<usize>(), parsed.blocks.len());
    assert_eq!(parsed.processes().count(), 1);

    let process = parsed.processes().next().unwrap();
    assert_eq!(process.name(), Some("Test process"));
    assert_eq!(
        process.metadata.get("Infrastructure"),
        Some(&MetadataValue::Boolean(false))
    );
    assert!(matches!(
        process.metadata.get("Date"),
        Some(MetadataValue::Date(date)) if date.to_string() == "2021-03-05"
    ));

    let products = process.exchanges(ProcessSection::Products);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].allocation, Some(100.0));
}

/// Test formula evaluation across global and process scopes
///
/// Purpose: Verify database, project and process-local parameters all feed exchange amounts
/// Benefit: Amounts driven by parameters are the bulk of real inventories
#[test]
fn test_parameters_drive_exchange_amounts() {
    let parsed = SimaProCsv::parse_str(PROCESS_EXPORT, ParseConfig::default()).unwrap();
    let process = parsed.processes().next().unwrap();

    let materials = process.exchanges(ProcessSection::MaterialsFuels);
    let steel = &materials[0];
    assert_eq!(steel.name, "Steel");
    assert!(approx(steel.amount, 1.0));
    assert_eq!(steel.original_formula.as_deref(), Some("total"));
    assert_eq!(steel.formula.as_deref(), Some("(SP_TOTAL) * 0.001"));

    let electricity = &process.exchanges(ProcessSection::ElectricityHeat)[0];
    assert!(approx(electricity.amount, 7.2));
    assert_eq!(electricity.unit, "MJ");

    let global = parsed
        .blocks
        .iter()
        .find_map(|block| match &block.data {
            BlockData::DatabaseCalculatedParameters(records) => records.first(),
            _ => None,
        })
        .unwrap();
    assert_eq!(global.name, "SP_TOTAL");
    assert_eq!(global.original_name, "total");
    assert!(approx(global.amount, 1000.0));
}

/// Test unit normalization of amounts and uncertainty
///
/// Purpose: Check grams become kilograms with the distribution rescaled alongside
/// Benefit: Downstream tools expect reference units only
#[test]
fn test_units_are_normalized() {
    let parsed = SimaProCsv::parse_str(PROCESS_EXPORT, ParseConfig::default()).unwrap();
    let process = parsed.processes().next().unwrap();
    let materials = process.exchanges(ProcessSection::MaterialsFuels);

    let steel = &materials[0];
    assert_eq!(steel.unit, "kg");
    assert_eq!(
        steel.unit_conversion,
        Some(UnitConversion {
            original_unit: "g".to_string(),
            factor: 0.001,
        })
    );
    match steel.uncertainty {
        Some(UncertaintyDistribution::Normal { loc, scale, .. }) => {
            assert!(approx(loc, 1.0));
            assert!(approx(scale, 0.002));
        }
        ref other => panic!("expected a normal distribution, got {:?}", other),
    }

    let copper = &materials[1];
    assert!(approx(copper.amount, 0.5));
    match copper.uncertainty {
        Some(UncertaintyDistribution::Triangular {
            minimum, maximum, ..
        }) => {
            assert!(approx(minimum, 0.4));
            assert!(approx(maximum, 0.6));
        }
        ref other => panic!("expected a triangular distribution, got {:?}", other),
    }

    let co2 = &process.exchanges(ProcessSection::EmissionsToAir)[0];
    assert_eq!(co2.unit, "kg");
    assert_eq!(co2.unit_conversion, None);
    match co2.uncertainty {
        Some(UncertaintyDistribution::Lognormal { loc, scale, .. }) => {
            assert!(approx(loc, 0.5_f64.ln()));
            assert!(approx(scale, 1.2_f64.sqrt().ln()));
        }
        ref other => panic!("expected a lognormal distribution, got {:?}", other),
    }
}

/// Test the enrichment passes that run after block parsing
///
/// Purpose: Confirm flow lists and literature blocks are copied onto the process
/// Benefit: Processes carry CAS numbers and references without a second lookup
#[test]
fn test_flow_lists_and_literature_are_linked() {
    let mut session = ParseSession::new(ParseConfig::default()).unwrap();
    let parsed = session.parse_str(PROCESS_EXPORT).unwrap();
    let process = parsed.processes().next().unwrap();

    let co2 = &process.exchanges(ProcessSection::EmissionsToAir)[0];
    assert_eq!(co2.cas_number.as_deref(), Some("124-38-9"));
    assert_eq!(co2.comment, "fossil");
    assert_eq!(
        co2.context,
        Some(("Emissions to air".to_string(), String::new()))
    );

    let Some(MetadataValue::References(links)) = process.metadata.get("Literature references")
    else {
        panic!("expected literature references");
    };
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].comment.as_deref(), Some("main"));
    assert!(links[0].resolved.is_some());
    assert!(links[1].resolved.is_none());
    assert!(session.warned_references().contains("Nowhere"));
}

/// Test parsing with resolution and normalization switched off
///
/// Purpose: Verify the raw values stay as written when the caller opts out
/// Benefit: Lets callers run their own formula engine on the source data
#[test]
fn test_raw_parse_keeps_formulas_and_units() {
    let config = ParseConfig::default()
        .without_parameter_resolution()
        .without_unit_normalization();
    let parsed = SimaProCsv::parse_str(PROCESS_EXPORT, config).unwrap();
    let process = parsed.processes().next().unwrap();
    let materials = process.exchanges(ProcessSection::MaterialsFuels);

    let steel = &materials[0];
    assert_eq!(steel.unit, "g");
    assert_eq!(steel.formula.as_deref(), Some("total"));
    assert_eq!(steel.uncertainty, None);
    assert_eq!(steel.unit_conversion, None);

    let copper = &materials[1];
    assert_eq!(copper.amount, 500.0);
    assert!(matches!(
        copper.uncertainty,
        Some(UncertaintyDistribution::Triangular { .. })
    ));
}

/// Test that a flow list heading can't start a file without `End` sentinels
///
/// Purpose: Verify the segmenter refuses to guess where such a block ends
/// Benefit: Avoids silently swallowing process sections into flow lists
#[test]
fn test_flow_list_without_end_is_ambiguous() {
    let text = "\
{SimaPro 9.5.0.1}
{processes}
{Project: Test project}
{CSV separator: Semicolon}
{Decimal separator: .}

Airborne emissions
Carbon dioxide;kg;124-38-9;
";
    let err = SimaProCsv::parse_str(text, ParseConfig::default()).unwrap_err();
    match err {
        SimaProError::IndeterminateBlockEnd { keyword, .. } => {
            assert_eq!(keyword, "Airborne emissions");
        }
        other => panic!("expected an indeterminate block end, got {:?}", other),
    }
}

/// Test that the same flow list parses once the file has used `End`
///
/// Purpose: Verify a prior sentinel makes trailing flow lists unambiguous
/// Benefit: Complete exports with flow lists at the tail must still load
#[test]
fn test_flow_list_after_end_sentinel() {
    let text = "\
{SimaPro 9.5.0.1}
{processes}
{Project: Test project}
{CSV separator: Semicolon}
{Decimal separator: .}

Units
kg;Mass;1;kg
End

Airborne emissions
Carbon dioxide;kg;124-38-9;
End
";
    let parsed = SimaProCsv::parse_str(text, ParseConfig::default()).unwrap();
    assert_eq!(parsed.blocks.len(), 2);
    match &parsed.blocks[1].data {
        BlockData::FlowList(list) => {
            assert_eq!(list.category, "Airborne emissions");
            assert_eq!(list.flows[0].cas_number.as_deref(), Some("124-38-9"));
        }
        other => panic!("expected a flow list, got {:?}", other),
    }
}

/// Test the gram to kilogram conversion on a literal amount
///
/// Purpose: Check the conversion factor and original unit are recorded
/// Benefit: Covers the simplest normalization most exports hit
#[test]
fn test_literal_amount_converted_to_reference_unit() {
    let text = "\
{SimaPro 9.5.0.1}
{processes}
{Project: Test project}
{CSV separator: Semicolon}
{Decimal separator: .}

Units
kg;Mass;1;kg
g;Mass;0.001;kg
End

Process

Category type
material

Products
Widget;kg;1;100;not defined;Others;

Materials/fuels
Steel;g;1000;Undefined;0;0;0;

End
";
    let parsed = SimaProCsv::parse_str(text, ParseConfig::default()).unwrap();
    let process = parsed.processes().next().unwrap();
    let steel = &process.exchanges(ProcessSection::MaterialsFuels)[0];

    assert_eq!(steel.unit, "kg");
    assert!(approx(steel.amount, 1.0));
    assert_eq!(
        steel.unit_conversion,
        Some(UnitConversion {
            original_unit: "g".to_string(),
            factor: 0.001,
        })
    );
}

/// Test reading a Windows-1252 encoded file from disk
///
/// Purpose: Exercise file decoding through `parse_file`
/// Benefit: SimaPro's default encoding isn't UTF-8
#[test]
fn test_parse_windows_1252_file() {
    let text = PROCESS_EXPORT.replace("Test process", "Café process");
    let (bytes, _, _) = WINDOWS_1252.encode(&text);

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let parsed = SimaProCsv::parse_file(file.path(), ParseConfig::default()).unwrap();
    let process = parsed.processes().next().unwrap();
    assert_eq!(process.name(), Some("Café process"));
}

/// Test that a missing file is reported with its path
///
/// Purpose: Check the I/O error variant carries the path
/// Benefit: Users see which file could not be read
#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.csv");
    match SimaProCsv::parse_file(&path, ParseConfig::default()) {
        Err(SimaProError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {:?}", other),
    }
}

/// Test JSON output of a parsed export
///
/// Purpose: Make sure the model serializes for the `--json` CLI flag
/// Benefit: JSON is the machine-readable output of the command-line tool
#[test]
fn test_parsed_export_serializes_to_json() {
    let parsed = SimaProCsv::parse_str(PROCESS_EXPORT, ParseConfig::default()).unwrap();
    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(json["database_name"], "Test project");
    assert!(json["blocks"].as_array().unwrap().len() >= 8);
}
