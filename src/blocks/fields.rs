//! Field and row utilities shared by the block parsers
//!
//! Numbers in SimaPro exports follow the decimal separator declared in the
//! header, may carry `_` or thousands separators, and may end in `%`. Rows
//! are grouped by blank lines, either as alternating key/value pairs or as
//! keyword-headed sections.

use crate::constants::{FALSE_TOKENS, TRUE_TOKENS};
use crate::error::{Result, SimaProError};
use crate::models::{Metadata, MetadataValue, RawRow};
use chrono::NaiveDate;
use regex::{Captures, Regex};

/// Thousands separator implied by a decimal separator
pub fn thousands_separator(decimal_separator: char) -> char {
    if decimal_separator == '.' { ',' } else { '.' }
}

/// Convert text to a number, honoring the decimal separator
///
/// Returns `None` when the text isn't numeric after cleanup.
pub fn as_number(text: &str, decimal_separator: char) -> Option<f64> {
    let text = text.trim();
    let (text, percent) = match text.strip_suffix('%') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (text, false),
    };
    let thousands = thousands_separator(decimal_separator);
    let normalized: String = text
        .chars()
        .filter(|&c| c != '_' && c != thousands)
        .map(|c| if c == decimal_separator { '.' } else { c })
        .collect();

    if normalized.is_empty() || !normalized.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = normalized.parse().ok()?;
    Some(if percent { value / 100.0 } else { value })
}

/// Pattern for cells holding a plain number rather than a formula
pub fn number_pattern(decimal_separator: char) -> Result<Regex> {
    let decimal = regex::escape(&decimal_separator.to_string());
    let thousands = regex::escape(&thousands_separator(decimal_separator).to_string());
    let pattern = format!(
        r"^[+-]?(?:[\d_{thousands}]+{decimal}?[\d_{thousands}]*|{decimal}[\d_{thousands}]+)(?:[eE][+-]?\d+)?\s*%?$"
    );
    Regex::new(&pattern).map_err(|e| SimaProError::Configuration {
        message: format!("Can't build number pattern for '{}': {}", decimal_separator, e),
    })
}

/// A cell value that is either a literal amount or a formula to evaluate
#[derive(Debug, Clone, PartialEq)]
pub enum AmountOrFormula {
    Amount(f64),
    Formula(String),
}

/// Number handling for one export, built from its decimal separator
#[derive(Debug, Clone)]
pub struct NumberFormat {
    decimal_separator: char,
    number_re: Regex,
    literal_re: Regex,
}

impl NumberFormat {
    pub fn new(decimal_separator: char) -> Result<Self> {
        let decimal = regex::escape(&decimal_separator.to_string());
        let literal = if decimal_separator == '.' {
            r"[A-Za-z_][A-Za-z0-9_]*|(?P<number>\d[\d_]*(?:\.\d+)?)".to_string()
        } else {
            format!(r"[A-Za-z_][A-Za-z0-9_]*|(?P<number>\d[\d_]*(?:\.\d{{3}})*(?:{decimal}\d+)?)")
        };
        let literal_re = Regex::new(&literal).map_err(|e| SimaProError::Configuration {
            message: format!("Can't build formula literal pattern: {}", e),
        })?;

        Ok(Self {
            decimal_separator,
            number_re: number_pattern(decimal_separator)?,
            literal_re,
        })
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    pub fn is_number(&self, text: &str) -> bool {
        let text = text.trim();
        let mantissa = text.split(['e', 'E']).next().unwrap_or("");
        self.number_re.is_match(text) && mantissa.chars().any(|c| c.is_ascii_digit())
    }

    pub fn parse(&self, text: &str) -> Option<f64> {
        as_number(text, self.decimal_separator)
    }

    /// Parse a number that must be present
    pub fn require(&self, text: &str, field: &str, line_no: usize) -> Result<f64> {
        self.parse(text)
            .ok_or_else(|| SimaProError::number_conversion(text, field, line_no))
    }

    /// Decide whether a cell is a literal amount or a formula
    pub fn amount_or_formula(&self, text: &str, field: &str, line_no: usize) -> Result<AmountOrFormula> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimaProError::number_conversion(text, field, line_no));
        }
        if self.is_number(text) {
            return self.require(text, field, line_no).map(AmountOrFormula::Amount);
        }
        Ok(AmountOrFormula::Formula(self.normalize_formula(text)))
    }

    /// Rewrite numeric literals inside a formula to `.`-decimal form
    ///
    /// Thousands groups are only stripped when the decimal separator isn't
    /// `.`, since `,` then separates `Iff` arguments.
    pub fn normalize_formula(&self, formula: &str) -> String {
        let thousands = thousands_separator(self.decimal_separator);
        self.literal_re
            .replace_all(formula, |caps: &Captures| match caps.name("number") {
                Some(number) => number
                    .as_str()
                    .chars()
                    .filter(|&c| c != '_' && (self.decimal_separator == '.' || c != thousands))
                    .map(|c| if c == self.decimal_separator { '.' } else { c })
                    .collect(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

// =============================================================================
// Booleans and dates
// =============================================================================

/// Interpret a SimaPro boolean token
pub fn as_boolean(text: &str) -> Option<bool> {
    let lower = text.trim().to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn require_boolean(text: &str, line_no: usize) -> Result<bool> {
    as_boolean(text).ok_or_else(|| SimaProError::BooleanConversion {
        value: text.to_string(),
        line_no,
    })
}

/// Boolean when the text is a boolean token, otherwise the text itself
pub fn as_boolean_or_text(text: &str) -> MetadataValue {
    match as_boolean(text) {
        Some(value) => MetadataValue::Boolean(value),
        None => MetadataValue::Text(text.to_string()),
    }
}

/// Parse a process date such as `10/12/2016` or `2016-12-10`
pub fn parse_date(text: &str, dayfirst: bool) -> Option<NaiveDate> {
    let parts: Vec<&str> = text
        .trim()
        .split(['/', '.', '-'])
        .map(str::trim)
        .collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    let numbers: Vec<u32> = [a, b, c]
        .iter()
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    let (year, month, day) = if a.len() == 4 {
        (numbers[0] as i32, numbers[1], numbers[2])
    } else {
        let year = match c.len() {
            4 => numbers[2] as i32,
            2 if numbers[2] < 70 => 2000 + numbers[2] as i32,
            2 => 1900 + numbers[2] as i32,
            _ => return None,
        };
        if dayfirst {
            (year, numbers[1], numbers[0])
        } else {
            (year, numbers[0], numbers[1])
        }
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

// =============================================================================
// Row grouping
// =============================================================================

/// Rows that aren't blank
pub fn skip_empty(rows: &[RawRow]) -> impl Iterator<Item = &RawRow> {
    rows.iter().filter(|row| !row.is_blank())
}

/// Slice starting at the first non-blank row
pub fn jump_to_nonempty(rows: &[RawRow]) -> &[RawRow] {
    let start = rows.iter().position(|row| !row.is_blank()).unwrap_or(rows.len());
    &rows[start..]
}

/// Read `key` / value rows separated by blank lines
///
/// A single value cell becomes text, several cells a list, and several
/// value rows are joined into one multi-line text.
pub fn alternating_key_value(rows: &[RawRow]) -> Metadata {
    let mut metadata = Metadata::new();
    let mut index = 0;

    while index < rows.len() {
        if rows[index].is_blank() {
            index += 1;
            continue;
        }
        let key = rows[index].first().to_string();
        index += 1;

        let mut values: Vec<&RawRow> = Vec::new();
        while index < rows.len() && !rows[index].is_blank() {
            values.push(&rows[index]);
            index += 1;
        }

        let value = match values.as_slice() {
            [] => MetadataValue::Text(String::new()),
            [single] => {
                let cells = single.non_empty_from(0);
                if cells.len() > 1 {
                    MetadataValue::List(cells.into_iter().map(str::to_string).collect())
                } else {
                    MetadataValue::Text(single.first().to_string())
                }
            }
            many => MetadataValue::Text(
                many.iter()
                    .map(|row| row.first())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        };
        metadata.insert(key, value);
    }

    metadata
}

/// A keyword row and the rows of its body
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSection {
    pub keyword: String,
    pub line_no: usize,
    pub rows: Vec<RawRow>,
}

/// Split rows into keyword-headed sections
///
/// Blank rows before a body are skipped; a body ends at a blank row or at
/// a row holding only one of `stop_terms`, which starts the next section.
/// Sections with empty bodies are left out. A keyword row with more than
/// one non-empty cell is malformed.
pub fn key_multiline_values(
    rows: &[RawRow],
    stop_terms: &[&str],
    block: &str,
) -> Result<Vec<KeywordSection>> {
    let is_stop = |row: &RawRow| {
        stop_terms.contains(&row.first()) && row.non_empty_from(1).is_empty()
    };

    let mut sections = Vec::new();
    let mut index = 0;

    while index < rows.len() {
        if rows[index].is_blank() {
            index += 1;
            continue;
        }

        let keyword_row = &rows[index];
        if keyword_row.non_empty_from(0).len() > 1 {
            return Err(SimaProError::malformed_block(
                block,
                keyword_row.line_no,
                format!("expected a section keyword, found '{}'", keyword_row.fields.join(";")),
            ));
        }
        index += 1;

        while index < rows.len() && rows[index].is_blank() {
            index += 1;
        }

        let mut body = Vec::new();
        while index < rows.len() && !rows[index].is_blank() && !is_stop(&rows[index]) {
            body.push(rows[index].clone());
            index += 1;
        }

        if !body.is_empty() {
            sections.push(KeywordSection {
                keyword: keyword_row.non_empty_from(0).first().copied().unwrap_or("").to_string(),
                line_no: keyword_row.line_no,
                rows: body,
            });
        }
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line_no: usize, fields: &[&str]) -> RawRow {
        RawRow::new(line_no, fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number("4.2", '.'), Some(4.2));
        assert_eq!(as_number("400_404.2", '.'), Some(400404.2));
        assert_eq!(as_number("400_404,2", ','), Some(400404.2));
        assert_eq!(as_number("400.404,2", ','), Some(400404.2));
        assert_eq!(as_number("1.5e-3", '.'), Some(0.0015));
        assert_eq!(as_number("foo", '.'), None);
        assert_eq!(as_number("", '.'), None);
    }

    #[test]
    fn test_as_number_percentage() {
        let value = as_number("400.404,2%", ',').unwrap();
        assert!((value - 4004.042).abs() < 1e-9);
    }

    #[test]
    fn test_number_pattern() {
        let format = NumberFormat::new(',').unwrap();
        assert!(format.is_number("0,00062_39543.23"));
        assert!(format.is_number("-1,5"));
        assert!(!format.is_number("m3"));
        assert!(!format.is_number("2*a"));
        assert!(!format.is_number(""));

        let format = NumberFormat::new('.').unwrap();
        assert!(format.is_number("0.000623954323"));
        assert!(format.is_number("1.28E-06"));
        assert!(!format.is_number("m3"));
    }

    fn normalize(formula: &str, decimal_separator: char) -> String {
        NumberFormat::new(decimal_separator)
            .unwrap()
            .normalize_formula(formula)
    }

    #[test]
    fn test_normalize_formula_numbers() {
        assert_eq!(normalize("400_404;2", ';'), "400404.2");
        assert_eq!(normalize("400.404,2", ','), "400404.2");
        assert_eq!(normalize("alpha * 400.404,2", ','), "alpha * 400404.2");
        assert_eq!(normalize("2/2,20462", ','), "2/2.20462");
        assert_eq!(normalize("m3_2 * 1_000", '.'), "m3_2 * 1000");
        assert_eq!(normalize("Iff(a, 100,200)", '.'), "Iff(a, 100,200)");
    }

    #[test]
    fn test_amount_or_formula() {
        let format = NumberFormat::new('.').unwrap();
        assert_eq!(
            format.amount_or_formula("0.5", "amount", 1).unwrap(),
            AmountOrFormula::Amount(0.5)
        );
        assert_eq!(
            format.amount_or_formula("2*a", "amount", 1).unwrap(),
            AmountOrFormula::Formula("2*a".to_string())
        );
        assert!(format.amount_or_formula("", "amount", 1).is_err());
    }

    #[test]
    fn test_exponent_alone_is_a_formula() {
        let format = NumberFormat::new('.').unwrap();
        assert!(!format.is_number("e5"));
        assert!(!format.is_number("E2"));
        assert!(!format.is_number("_e5"));
        assert!(format.is_number(".5e3"));
        assert_eq!(
            format.amount_or_formula("e5", "amount", 3).unwrap(),
            AmountOrFormula::Formula("e5".to_string())
        );

        let format = NumberFormat::new(',').unwrap();
        assert!(!format.is_number("E2"));
        assert!(format.is_number("1,5E2"));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(as_boolean("Yes"), Some(true));
        assert_eq!(as_boolean("f"), Some(false));
        assert_eq!(as_boolean("maybe"), None);
        assert!(require_boolean("maybe", 4).is_err());
        assert_eq!(as_boolean_or_text("No"), MetadataValue::Boolean(false));
        assert_eq!(
            as_boolean_or_text("Others"),
            MetadataValue::Text("Others".to_string())
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("10/12/2016", true), NaiveDate::from_ymd_opt(2016, 12, 10));
        assert_eq!(parse_date("10/12/2016", false), NaiveDate::from_ymd_opt(2016, 10, 12));
        assert_eq!(parse_date("2016-12-10", true), NaiveDate::from_ymd_opt(2016, 12, 10));
        assert_eq!(parse_date("23.06.21", true), NaiveDate::from_ymd_opt(2021, 6, 23));
        assert_eq!(parse_date("31/31/2016", true), None);
        assert_eq!(parse_date("yesterday", true), None);
    }

    #[test]
    fn test_skip_empty_and_jump() {
        let rows = vec![row(0, &[]), row(1, &["", ""]), row(2, &["bar"]), row(3, &[])];
        assert_eq!(skip_empty(&rows).count(), 1);
        assert_eq!(jump_to_nonempty(&rows)[0].line_no, 2);
        assert!(jump_to_nonempty(&rows[3..]).is_empty());
    }

    #[test]
    fn test_alternating_key_value() {
        let rows = vec![
            row(1, &[]),
            row(2, &["Name"]),
            row(3, &["DC Test"]),
            row(4, &[]),
            row(5, &["Version"]),
            row(6, &["1", "8"]),
            row(7, &[]),
            row(8, &["Comment"]),
            row(9, &[]),
            row(10, &["Description"]),
            row(11, &["first"]),
            row(12, &["second"]),
        ];
        let metadata = alternating_key_value(&rows);
        assert_eq!(metadata.get_text("Name"), Some("DC Test"));
        assert_eq!(
            metadata.get("Version"),
            Some(&MetadataValue::List(vec!["1".to_string(), "8".to_string()]))
        );
        assert_eq!(metadata.get_text("Comment"), Some(""));
        assert_eq!(metadata.get_text("Description"), Some("first\nsecond"));
    }

    #[test]
    fn test_key_multiline_values() {
        let rows = vec![
            row(0, &[]),
            row(1, &[""]),
            row(2, &["", ""]),
            row(4, &["Header"]),
            row(5, &[""]),
            row(6, &["data", "1"]),
            row(7, &["data", "2"]),
            row(8, &[]),
            row(9, &["Header 2"]),
            row(10, &[""]),
            row(11, &["data", "3"]),
        ];
        let sections = key_multiline_values(&rows, &[], "Process").unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].keyword, "Header");
        assert_eq!(sections[0].rows.len(), 2);
        assert_eq!(sections[1].keyword, "Header 2");
        assert_eq!(sections[1].rows[0].line_no, 11);
    }

    #[test]
    fn test_key_multiline_values_stop_terms() {
        let rows = vec![
            row(4, &["Header"]),
            row(6, &["data", "1"]),
            row(8, &[]),
            row(9, &["Header 2"]),
            row(10, &[""]),
            row(11, &["Stop"]),
            row(12, &["data", "3"]),
            row(13, &[]),
            row(14, &["Stop"]),
        ];
        let sections = key_multiline_values(&rows, &["Stop"], "Process").unwrap();
        let keywords: Vec<&str> = sections.iter().map(|s| s.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["Header", "Stop"]);
        assert_eq!(sections[1].rows[0].line_no, 12);
    }

    #[test]
    fn test_key_multiline_values_malformed_keyword() {
        let rows = vec![row(0, &[]), row(2, &["Foo", "bar"]), row(3, &[""])];
        let err = key_multiline_values(&rows, &[], "Process").unwrap_err();
        assert_eq!(err.line_no(), Some(2));
    }
}
