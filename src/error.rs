//! Error handling for SimaPro CSV parsing.
//!
//! Every variant here is fatal and aborts the whole parse. Recoverable
//! data-quality issues (bad CAS numbers, invalid uncertainty parameters,
//! unknown units and so on) never reach this type; they are logged through
//! `tracing` and the data is degraded in place.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimaProError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed header preamble: {reason}")]
    MalformedHeader { reason: String },

    #[error("Unsupported CSV delimiter '{delimiter}': must be a single ASCII character")]
    UnsupportedDelimiter { delimiter: String },

    #[error("Could not split rows near line {line_no}: {source}")]
    RowSplit {
        line_no: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Unknown block type '{keyword}' on line {line_no}")]
    UnknownBlock { keyword: String, line_no: usize },

    #[error(
        "Flow lists are given at the end of this file, but the section heading '{keyword}' \
         (line {line_no}) is also used inside processes. This file never marks block ends \
         with 'End', so we can't tell whether '{keyword}' starts a new block"
    )]
    IndeterminateBlockEnd { keyword: String, line_no: usize },

    #[error("Malformed '{block}' block on line {line_no}: {reason}")]
    MalformedBlock {
        block: String,
        line_no: usize,
        reason: String,
    },

    #[error("Waste model mismatch in process starting on line {line_no}: {reason}")]
    WasteModelMismatch { line_no: usize, reason: String },

    #[error("Can't convert '{value}' to a number on line {line_no} ({field})")]
    NumberConversion {
        value: String,
        field: String,
        line_no: usize,
    },

    #[error("Can't convert '{value}' to boolean on line {line_no}")]
    BooleanConversion { value: String, line_no: usize },

    #[error("Unknown uncertainty type '{kind}' on line {line_no}")]
    UnknownUncertaintyKind { kind: String, line_no: usize },

    #[error("Syntax error in formula '{formula}' on line {line_no}: {reason}")]
    FormulaSyntax {
        formula: String,
        line_no: usize,
        reason: String,
    },

    #[error("Formula '{formula}' on line {line_no} uses the reserved word '{word}'")]
    ReservedWord {
        word: String,
        formula: String,
        line_no: usize,
    },

    #[error("Undefined symbol '{symbol}' referenced by '{owner}' on line {line_no}")]
    UndefinedSymbol {
        symbol: String,
        owner: String,
        line_no: usize,
    },

    #[error("Circular reference between calculated parameters: {}", parameters.join(", "))]
    CircularReference { parameters: Vec<String> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl SimaProError {
    pub fn malformed_block(
        block: impl Into<String>,
        line_no: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedBlock {
            block: block.into(),
            line_no,
            reason: reason.into(),
        }
    }

    pub fn number_conversion(
        value: impl Into<String>,
        field: impl Into<String>,
        line_no: usize,
    ) -> Self {
        Self::NumberConversion {
            value: value.into(),
            field: field.into(),
            line_no,
        }
    }

    /// Line number the error points at, when it has one
    pub fn line_no(&self) -> Option<usize> {
        match self {
            Self::RowSplit { line_no, .. }
            | Self::UnknownBlock { line_no, .. }
            | Self::IndeterminateBlockEnd { line_no, .. }
            | Self::MalformedBlock { line_no, .. }
            | Self::WasteModelMismatch { line_no, .. }
            | Self::NumberConversion { line_no, .. }
            | Self::BooleanConversion { line_no, .. }
            | Self::UnknownUncertaintyKind { line_no, .. }
            | Self::FormulaSyntax { line_no, .. }
            | Self::ReservedWord { line_no, .. }
            | Self::UndefinedSymbol { line_no, .. } => Some(*line_no),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimaProError>;
