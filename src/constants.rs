//! Application constants for the SimaPro CSV parser
//!
//! This module contains the fixed vocabularies of the export format: header
//! labels, block and section keywords, context mappings, and default values.

// =============================================================================
// Header Preamble
// =============================================================================

/// Delimiters sometimes written out as words in the `CSV separator` line
pub const DELIMITER_WORDS: &[(&str, char)] = &[("semicolon", ';'), ("tab", '\t'), ("comma", ',')];

/// Delimiters seen in real exports; anything else gets a warning
pub const USUAL_DELIMITERS: &[char] = &[';', '.', '\t', '|', ' ', ','];

/// Header labels whose value is a boolean token, with the field they set
pub const BOOLEAN_LABELS: &[(&str, &str)] = &[
    ("Convert expressions to constants:", "convert_expressions"),
    ("Exclude library processes:", "exclude_library_processes"),
    ("Export platform IDs:", "export_platform_ids"),
    ("Include sub product stages and processes:", "include_stages"),
    (
        "Related objects (system descriptions, substances, units, etc.):",
        "related_objects",
    ),
    ("Skip empty fields:", "skip_empty_fields"),
    ("Skip unused parameters:", "skip_unused_parameters"),
];

/// Header labels whose value is kept as text, with the field they set
pub const STRING_LABELS: &[(&str, &str)] = &[
    ("CSV Format version:", "csv_version"),
    ("Date separator:", "date_separator"),
    ("Decimal separator:", "decimal_separator"),
    ("Open library:", "open_library"),
    ("Open project:", "open_project"),
    ("Project:", "project"),
    ("Projet:", "project"),
    ("Selection:", "selection"),
];

pub const DEFAULT_DECIMAL_SEPARATOR: char = '.';
pub const DEFAULT_DATE_SEPARATOR: &str = "/";

// =============================================================================
// Block Keywords
// =============================================================================

/// Literal single-field row closing a block
pub const END_SENTINEL: &str = "End";

/// Top-level block headers that are never ambiguous
pub const CONTROL_BLOCK_KEYWORDS: &[&str] = &[
    "Database Calculated parameters",
    "Database Input parameters",
    "Literature reference",
    "Project Input parameters",
    "Project Calculated parameters",
    "Quantities",
    "Product stage",
    "Units",
    "Process",
    "Method",
    "Impact category",
    "Normalization-Weighting set",
    "Damage category",
];

/// Trailing flow-list headers, which double as process section names
pub const INDETERMINATE_BLOCK_KEYWORDS: &[&str] = &[
    "Non material emissions",
    "Airborne emissions",
    "Waterborne emissions",
    "Raw materials",
    "Final waste flows",
    "Emissions to soil",
    "Social issues",
    "Economic issues",
    "System description",
];

/// Section headers inside a `Process` block
pub const PROCESS_SECTION_KEYWORDS: &[&str] = &[
    "Avoided products",
    "Calculated parameters",
    "Economic issues",
    "Electricity/heat",
    "Emissions to air",
    "Emissions to soil",
    "Emissions to water",
    "Final waste flows",
    "Input parameters",
    "Materials/fuels",
    "Non material emissions",
    "Products",
    "Remaining waste",
    "Resources",
    "Separated waste",
    "Social issues",
    "Waste scenario",
    "Waste to treatment",
    "Waste treatment",
];

// =============================================================================
// Process Metadata
// =============================================================================

/// Metadata key holding `name; comment` literature rows
pub const LITERATURE_REFERENCES_KEY: &str = "Literature references";

/// Metadata keys with special value parsing
pub const DATE_KEY: &str = "Date";
pub const INFRASTRUCTURE_KEY: &str = "Infrastructure";
pub const CATEGORY_TYPE_KEY: &str = "Category type";

/// `Category type` value required for waste treatment processes
pub const WASTE_TREATMENT_CATEGORY: &str = "waste treatment";

/// Joins multi-cell metadata values and appended comments
pub const FIELD_JOINER: &str = " ⧺ ";

/// Map from trailing flow-list categories to process section labels
pub const CONTEXT_MAPPING: &[(&str, &str)] = &[
    ("Non material emissions", "Non material emissions"),
    ("Airborne emissions", "Emissions to air"),
    ("Waterborne emissions", "Emissions to water"),
    ("Raw materials", "Resources"),
    ("Final waste flows", "Final waste flows"),
    ("Emissions to soil", "Emissions to soil"),
    ("Social issues", "Social issues"),
    ("Economic issues", "Economic issues"),
];

// =============================================================================
// Parameters and Formulas
// =============================================================================

/// Prefix added to every uppercased parameter name
pub const DEFAULT_PARAMETER_PREFIX: &str = "SP_";

/// Words that can't be used as identifiers in compiled formulas
pub const RESERVED_WORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield", "None",
    "True", "False",
];

/// Keyword rewritten before compilation, and its replacement
pub const RENAMED_KEYWORD: (&str, &str) = ("yield", "YIELD");

/// Boolean token vocabulary, compared case-insensitively
pub const TRUE_TOKENS: &[&str] = &["yes", "y", "true", "t", "1"];
pub const FALSE_TOKENS: &[&str] = &["no", "n", "false", "f", "0"];

/// Look up the process section label a trailing flow list supplements
pub fn context_for_flow_list(category: &str) -> Option<&'static str> {
    CONTEXT_MAPPING
        .iter()
        .find(|(flow_list, _)| *flow_list == category)
        .map(|(_, section)| *section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_catalogs_are_disjoint() {
        for keyword in INDETERMINATE_BLOCK_KEYWORDS {
            assert!(!CONTROL_BLOCK_KEYWORDS.contains(keyword));
        }
    }

    #[test]
    fn test_context_for_flow_list() {
        assert_eq!(context_for_flow_list("Airborne emissions"), Some("Emissions to air"));
        assert_eq!(context_for_flow_list("Raw materials"), Some("Resources"));
        assert_eq!(context_for_flow_list("System description"), None);
    }
}
