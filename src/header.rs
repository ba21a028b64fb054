//! SimaPro CSV header parsing.
//!
//! The preamble is a run of brace-wrapped lines (sometimes also quoted)
//! giving the SimaPro version, export kind, delimiter, number and date
//! conventions, and the libraries used. Everything after it is read with
//! the settings found here.

use crate::blocks::fields::{as_boolean, parse_date};
use crate::constants::{
    BOOLEAN_LABELS, DEFAULT_DATE_SEPARATOR, DEFAULT_DECIMAL_SEPARATOR, DELIMITER_WORDS,
    STRING_LABELS,
};
use crate::error::{Result, SimaProError};
use crate::models::ExportKind;
use chrono::{Local, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings and provenance from the header preamble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub simapro_version: String,
    pub kind: ExportKind,
    pub delimiter: char,
    pub decimal_separator: char,
    pub date_separator: String,
    /// Dates are written day before month
    pub dayfirst: bool,
    pub project: Option<String>,
    pub csv_version: Option<String>,
    pub libraries: Vec<String>,
    pub selection: Option<String>,
    pub open_project: Option<String>,
    pub open_library: Option<String>,
    pub convert_expressions: Option<bool>,
    pub exclude_library_processes: Option<bool>,
    pub export_platform_ids: Option<bool>,
    pub include_stages: Option<bool>,
    pub related_objects: Option<bool>,
    pub skip_empty_fields: Option<bool>,
    pub skip_unused_parameters: Option<bool>,
    pub created: NaiveDateTime,
}

/// Parse header lines as returned by [`crate::reader::split_preamble`]
pub fn parse_header(lines: &[&str]) -> Result<Header> {
    let mut builder = HeaderBuilder::default();
    for (index, line) in lines.iter().enumerate() {
        builder.parse_line(strip_braces(line), index + 1)?;
    }
    let header = builder.build()?;

    debug!(
        "Parsed header: SimaPro {}, {} export, delimiter {:?}, decimal separator {:?}",
        header.simapro_version, header.kind, header.delimiter, header.decimal_separator
    );
    Ok(header)
}

/// Remove `{...}` or `"{...}"` wrapping
fn strip_braces(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .unwrap_or(line);
    line.strip_prefix('{')
        .and_then(|l| l.strip_suffix('}'))
        .unwrap_or(line)
}

/// Remove one level of matching single or double quotes
fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Builder for header extraction
#[derive(Default)]
struct HeaderBuilder {
    simapro_version: Option<String>,
    kind: Option<ExportKind>,
    delimiter: Option<char>,
    date: Option<String>,
    time: Option<String>,
    short_date_format: Option<String>,
    libraries: Vec<String>,
    strings: Vec<(&'static str, String)>,
    booleans: Vec<(&'static str, bool)>,
}

impl HeaderBuilder {
    fn parse_line(&mut self, line: &str, line_no: usize) -> Result<()> {
        if let Some(version) = line.strip_prefix("SimaPro ")
            && !line.contains(':')
        {
            self.simapro_version = Some(version.trim().to_string());
        } else if let Some(kind) = ExportKind::from_label(line) {
            self.kind = Some(kind);
        } else if let Some(value) = line.strip_prefix("CSV separator:") {
            self.delimiter = Some(parse_delimiter(value)?);
        } else if let Some(value) = line.strip_prefix("Date:") {
            self.date = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Time:") {
            self.time = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Short date format:") {
            self.short_date_format = Some(value.trim().to_string());
        } else if let Some((label, field)) = BOOLEAN_LABELS
            .iter()
            .find(|(label, _)| line.starts_with(label))
        {
            let value = line[label.len()..].trim();
            let parsed = as_boolean(value).ok_or_else(|| SimaProError::BooleanConversion {
                value: value.to_string(),
                line_no,
            })?;
            self.booleans.push((*field, parsed));
        } else if let Some((label, field)) = STRING_LABELS
            .iter()
            .find(|(label, _)| line.starts_with(label))
        {
            let value = strip_quotes(line[label.len()..].trim());
            self.strings.push((*field, value.to_string()));
        } else if let Some(library) = line.strip_prefix("Library ") {
            self.libraries.push(strip_quotes(library.trim()).to_string());
        } else {
            warn!("Can't understand header line (skipping): {}", line);
        }
        Ok(())
    }

    fn string(&self, field: &str) -> Option<String> {
        self.strings
            .iter()
            .rev()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.clone())
    }

    fn boolean(&self, field: &str) -> Option<bool> {
        self.booleans
            .iter()
            .rev()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| *value)
    }

    /// Day-first unless the short date format puts month before day
    fn dayfirst(&self) -> bool {
        match (&self.date, &self.time, &self.short_date_format) {
            (Some(date), Some(time), Some(format))
                if !date.is_empty() && !time.is_empty() && !format.is_empty() =>
            {
                match (format.find('M'), format.find('d')) {
                    (Some(month), Some(day)) => month > day,
                    _ => true,
                }
            }
            _ => true,
        }
    }

    fn created(&self, dayfirst: bool) -> NaiveDateTime {
        let date = self.date.as_deref().and_then(|d| parse_date(d, dayfirst));
        let time = self.time.as_deref().and_then(parse_time);
        match (date, time) {
            (Some(date), Some(time)) => date.and_time(time),
            _ => {
                debug!("Header has no usable creation date, using current time");
                Local::now().naive_local()
            }
        }
    }

    fn build(self) -> Result<Header> {
        let simapro_version = self
            .simapro_version
            .clone()
            .ok_or_else(|| SimaProError::MalformedHeader {
                reason: "Missing SimaPro version line".to_string(),
            })?;

        let delimiter = self.delimiter.ok_or_else(|| SimaProError::MalformedHeader {
            reason: "Missing 'CSV separator' line".to_string(),
        })?;

        let kind = self.kind.unwrap_or_else(|| {
            warn!(
                "Export is missing type (processes, methods, or product stages). \
                 Using default value of 'processes'"
            );
            ExportKind::Processes
        });

        let decimal_separator = self
            .string("decimal_separator")
            .and_then(|s| s.chars().next())
            .unwrap_or(DEFAULT_DECIMAL_SEPARATOR);
        let date_separator = self
            .string("date_separator")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DATE_SEPARATOR.to_string());

        let dayfirst = self.dayfirst();
        let created = self.created(dayfirst);

        Ok(Header {
            simapro_version,
            kind,
            delimiter,
            decimal_separator,
            date_separator,
            dayfirst,
            project: self.string("project"),
            csv_version: self.string("csv_version"),
            libraries: self.libraries.clone(),
            selection: self.string("selection"),
            open_project: self.string("open_project"),
            open_library: self.string("open_library"),
            convert_expressions: self.boolean("convert_expressions"),
            exclude_library_processes: self.boolean("exclude_library_processes"),
            export_platform_ids: self.boolean("export_platform_ids"),
            include_stages: self.boolean("include_stages"),
            related_objects: self.boolean("related_objects"),
            skip_empty_fields: self.boolean("skip_empty_fields"),
            skip_unused_parameters: self.boolean("skip_unused_parameters"),
            created,
        })
    }
}

/// Delimiter from a `CSV separator:` value, literal or spelled out
fn parse_delimiter(value: &str) -> Result<char> {
    // A literal tab would be lost to a full trim
    let value = value.trim_matches(' ');
    if let Some((_, delimiter)) = DELIMITER_WORDS
        .iter()
        .find(|(word, _)| word.eq_ignore_ascii_case(value))
    {
        return Ok(*delimiter);
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        (None, _) => Err(SimaProError::MalformedHeader {
            reason: "Empty 'CSV separator' value".to_string(),
        }),
        _ => Err(SimaProError::UnsupportedDelimiter {
            delimiter: value.to_string(),
        }),
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    ["%I:%M:%S %p", "%I:%M %p", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_lines() -> Vec<&'static str> {
        vec![
            "{SimaPro 8.2.0.0}",
            "{processes}",
            "{Date: 10/12/2016}",
            "{Time: 10:54:47 PM}",
            "{Project: Bobs_burgers}",
            "{CSV Format version: 8.0.5}",
            "{CSV separator: Semicolon}",
            "{Decimal separator: .}",
            "{Date separator: /}",
            "{Short date format: dd/MM/yyyy}",
            "{Selection: Selection (2)}",
            "{Related objects (system descriptions, substances, units, etc.): Yes}",
            "{Include sub product stages and processes: Yes}",
            "\"{Skip empty fields: No}\"",
            "{Library 'Methods'}",
        ]
    }

    #[test]
    fn test_header_parsing_complete() {
        let header = parse_header(&sample_lines()).unwrap();

        assert_eq!(header.simapro_version, "8.2.0.0");
        assert_eq!(header.kind, ExportKind::Processes);
        assert_eq!(header.delimiter, ';');
        assert_eq!(header.decimal_separator, '.');
        assert_eq!(header.project.as_deref(), Some("Bobs_burgers"));
        assert_eq!(header.csv_version.as_deref(), Some("8.0.5"));
        assert_eq!(header.libraries, vec!["Methods".to_string()]);
        assert_eq!(header.related_objects, Some(true));
        assert_eq!(header.skip_empty_fields, Some(false));
        assert_eq!(header.export_platform_ids, None);
        assert!(header.dayfirst);
        assert_eq!(
            header.created,
            NaiveDate::from_ymd_opt(2016, 12, 10)
                .unwrap()
                .and_hms_opt(22, 54, 47)
                .unwrap()
        );
    }

    #[test]
    fn test_month_first_date_format() {
        let mut lines = sample_lines();
        lines[9] = "{Short date format: M/d/yyyy}";
        let header = parse_header(&lines).unwrap();
        assert!(!header.dayfirst);
        assert_eq!(header.created.date(), NaiveDate::from_ymd_opt(2016, 10, 12).unwrap());
    }

    #[test]
    fn test_tab_delimiter() {
        let header = parse_header(&["{SimaPro 9.0}", "{methods}", "{CSV separator: Tab}"]).unwrap();
        assert_eq!(header.delimiter, '\t');
        assert_eq!(header.kind, ExportKind::Methods);

        let header = parse_header(&["{SimaPro 9.0}", "{CSV separator: \t}"]).unwrap();
        assert_eq!(header.delimiter, '\t');
    }

    #[test]
    fn test_missing_kind_defaults_to_processes() {
        let header = parse_header(&["{SimaPro 9.0}", "{CSV separator: ;}"]).unwrap();
        assert_eq!(header.kind, ExportKind::Processes);
        assert_eq!(header.date_separator, "/");
        assert_eq!(header.project, None);
    }

    #[test]
    fn test_missing_delimiter_is_malformed() {
        let err = parse_header(&["{SimaPro 9.0}", "{processes}"]).unwrap_err();
        assert!(matches!(err, SimaProError::MalformedHeader { .. }));

        let err = parse_header(&["{processes}", "{CSV separator: ;}"]).unwrap_err();
        assert!(matches!(err, SimaProError::MalformedHeader { .. }));
    }

    #[test]
    fn test_bad_boolean_value() {
        let err = parse_header(&["{SimaPro 9.0}", "{Skip empty fields: Sometimes}"]).unwrap_err();
        assert!(matches!(err, SimaProError::BooleanConversion { line_no: 2, .. }));
    }

    #[test]
    fn test_french_project_label() {
        let header =
            parse_header(&["{SimaPro 9.0}", "{CSV separator: ;}", "{Projet: Mon projet}"]).unwrap();
        assert_eq!(header.project.as_deref(), Some("Mon projet"));
    }
}
