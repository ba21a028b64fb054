//! Command-line interface components.

use crate::config::ParseConfig;
use crate::models::{Exchange, Section};
use crate::session::{ParseSession, SimaProCsv};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "simapro-csv")]
#[command(about = "Parse SimaPro CSV exports and summarize or dump their contents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// SimaPro CSV export to read
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the parsed model as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep exchange units as written
    #[arg(long)]
    pub no_units: bool,

    /// Don't evaluate parameters and formulas
    #[arg(long)]
    pub no_parameters: bool,

    /// Database name (defaults to the project named in the header)
    #[arg(long, value_name = "NAME")]
    pub database_name: Option<String>,

    /// Prefix for parameter aliases
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }

    pub fn to_config(&self) -> ParseConfig {
        let mut config = ParseConfig::default();
        if let Some(name) = &self.database_name {
            config = config.with_database_name(name);
        }
        if let Some(prefix) = &self.prefix {
            config = config.with_parameter_prefix(prefix);
        }
        if self.no_units {
            config = config.without_unit_normalization();
        }
        if self.no_parameters {
            config = config.without_parameter_resolution();
        }
        config
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("simapro_csv={}", args.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Parse the file named on the command line and report on it
pub fn run(args: &Args) -> Result<SimaProCsv> {
    debug!("Command line arguments: {:?}", args);

    let mut session = ParseSession::new(args.to_config())?;
    let parsed = session
        .parse_file(&args.file)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&parsed).context("Failed to serialize to JSON")?;
        println!("{}", json);
    } else {
        print_summary(&parsed);
    }
    Ok(parsed)
}

/// Colored human-readable overview of a parsed export
pub fn print_summary(parsed: &SimaProCsv) {
    let header = &parsed.header;
    println!(
        "{} {} ({} export)",
        "SimaPro".bold(),
        header.simapro_version.bold(),
        header.kind
    );
    if let Some(name) = &parsed.database_name {
        println!("   • Database: {}", name.cyan());
    }
    println!(
        "   • Delimiter: {:?}, decimal separator: {:?}",
        header.delimiter, header.decimal_separator
    );
    if !header.libraries.is_empty() {
        println!("   • Libraries: {}", header.libraries.join(", "));
    }

    println!("\n{}", "Blocks:".bold());
    for (label, count) in parsed.block_counts() {
        println!("   • {}: {}", label, count.to_string().green());
    }

    let processes: Vec<_> = parsed.processes().collect();
    if !processes.is_empty() {
        let exchanges: Vec<&Exchange> = processes
            .iter()
            .flat_map(|process| process.sections.values())
            .filter_map(|section| match section {
                Section::Exchanges(rows) => Some(rows.iter()),
                _ => None,
            })
            .flatten()
            .collect();
        let converted = exchanges
            .iter()
            .filter(|exchange| exchange.unit_conversion.is_some())
            .count();

        println!("\n{}", "Processes:".bold());
        println!("   • Processes: {}", processes.len().to_string().green());
        println!("   • Exchanges: {}", exchanges.len());
        if converted > 0 {
            println!("   • Unit conversions: {}", converted.to_string().yellow());
        }
    }
    println!();
}
