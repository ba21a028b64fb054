//! Tests for impact assessment blocks

use super::{dot_context, rows};
use crate::blocks::{BlockKind, parse_block};
use crate::error::SimaProError;
use crate::models::BlockData;

#[test]
fn test_impact_category() {
    let body = rows(
        "NORM - HH - Releases;man.SV\n\nSubstances\n\
         Air;(unspecified);Lead-210;014255-04-0;1.28E-06;kBq\n\
         \n\
         Water;(unspecified);Lead-210;;4.03E-09;kBq\n",
    );
    let BlockData::ImpactCategory(category) =
        parse_block(BlockKind::ImpactCategory, &body, &dot_context()).unwrap()
    else {
        panic!("expected impact category");
    };
    assert_eq!(category.name, "NORM - HH - Releases");
    assert_eq!(category.unit, "man.SV");
    assert_eq!(category.factors.len(), 2);
    assert_eq!(
        category.factors[0].context,
        ("Air".to_string(), "(unspecified)".to_string())
    );
    assert_eq!(category.factors[0].cas_number.as_deref(), Some("14255-04-0"));
    assert_eq!(category.factors[0].factor, 1.28e-6);
    assert_eq!(category.factors[1].cas_number, None);
    assert_eq!(category.factors[1].line_no, 6);
}

#[test]
fn test_impact_category_wrong_section() {
    let body = rows("Name;unit\n\nImpact categories\nfoo;1\n");
    let err = parse_block(BlockKind::ImpactCategory, &body, &dot_context()).unwrap_err();
    assert!(matches!(err, SimaProError::MalformedBlock { line_no: 3, .. }));
}

#[test]
fn test_damage_category() {
    let body = rows(
        "\nNORM - Ecosystems;PDFm3d\n\nImpact categories\nNORM - Eco - Freshwater;0.5\nNORM - Eco - Marine;0.25\n",
    );
    let BlockData::DamageCategory(category) =
        parse_block(BlockKind::DamageCategory, &body, &dot_context()).unwrap()
    else {
        panic!("expected damage category");
    };
    assert_eq!(category.name, "NORM - Ecosystems");
    assert_eq!(category.unit, "PDFm3d");
    assert_eq!(category.impact_categories.len(), 2);
    assert_eq!(category.impact_categories[1].factor, 0.25);
}

#[test]
fn test_normalization_weighting_set() {
    let body = rows(
        "IMPACT World+\n\nNormalization\nHuman health;1.37E+01\nEcosystem quality;1.01E-04\n\n\
         Weighting\nHuman health;5401.459854\n",
    );
    let BlockData::NormalizationWeightingSet(set) =
        parse_block(BlockKind::NormalizationWeightingSet, &body, &dot_context()).unwrap()
    else {
        panic!("expected normalization-weighting set");
    };
    assert_eq!(set.name, "IMPACT World+");
    assert_eq!(set.normalization.len(), 2);
    assert_eq!(set.normalization[0].factor, 13.7);
    assert_eq!(set.weighting.len(), 1);
    assert_eq!(set.weighting[0].name, "Human health");
}

#[test]
fn test_normalization_weighting_set_needs_section() {
    let body = rows("Set\n\nHuman health;1\n");
    let err = parse_block(BlockKind::NormalizationWeightingSet, &body, &dot_context()).unwrap_err();
    assert!(matches!(err, SimaProError::MalformedBlock { line_no: 3, .. }));
}
