//! SimaPro CSV Library
//!
//! A Rust library for reading life cycle inventory and impact assessment
//! exports written by SimaPro in its CSV format.
//!
//! This library provides tools for:
//! - Decoding files and splitting them into rows with locale-aware settings
//!   from the header preamble
//! - Segmenting rows into blocks, including files that never close blocks
//!   with `End`
//! - Parsing every block type into typed records
//! - Compiling SimaPro formulas and resolving scoped parameters
//! - Building uncertainty distributions and normalizing units
//!
//! ```no_run
//! use simapro_csv::{ParseConfig, SimaProCsv};
//! use std::path::Path;
//!
//! let parsed = SimaProCsv::parse_file(Path::new("export.csv"), ParseConfig::default())?;
//! for process in parsed.processes() {
//!     println!("{:?}", process.name());
//! }
//! # Ok::<(), simapro_csv::SimaProError>(())
//! ```

pub mod blocks;
pub mod cas;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod formula;
pub mod header;
pub mod models;
pub mod parameters;
pub mod reader;
pub mod segmenter;
pub mod session;
pub mod supplement;
pub mod uncertainty;
pub mod units;

// Re-export commonly used types
pub use config::ParseConfig;
pub use error::{Result, SimaProError};
pub use header::Header;
pub use models::{Block, BlockData, Exchange, ExportKind, ParameterRecord, Process, ProcessSection};
pub use session::{ParseSession, SimaProCsv};
pub use uncertainty::UncertaintyDistribution;
