//! Parse sessions and the parsed file model
//!
//! A [`ParseSession`] runs the whole pipeline over one export: header,
//! row splitting, segmentation, block parsing, parameter resolution, unit
//! normalization and the cross-block enrichment passes. Warnings that should
//! only be reported once (unknown units, missing literature references) are
//! deduplicated per session.

use crate::blocks::{BlockContext, parse_block};
use crate::config::ParseConfig;
use crate::error::{Result, SimaProError};
use crate::header::{Header, parse_header};
use crate::models::{Block, Process};
use crate::parameters::{ParameterResolver, attach_uncertainty};
use crate::reader::{RowSource, read_file, split_preamble, split_rows};
use crate::segmenter::{Segment, Segmenter};
use crate::supplement::{link_literature, supplement_biosphere};
use crate::units::UnitRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// A parsed SimaPro CSV export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimaProCsv {
    pub header: Header,
    /// Required for process and product stage exports
    pub database_name: Option<String>,
    /// Blocks in file order
    pub blocks: Vec<Block>,
}

impl SimaProCsv {
    /// Parse decoded file contents with a fresh session
    pub fn parse_str(text: &str, config: ParseConfig) -> Result<Self> {
        ParseSession::new(config)?.parse_str(text)
    }

    /// Read, decode and parse a file with a fresh session
    pub fn parse_file(path: &Path, config: ParseConfig) -> Result<Self> {
        ParseSession::new(config)?.parse_file(path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.blocks.iter().filter_map(Block::as_process)
    }

    /// Number of blocks per kind label
    pub fn block_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for block in &self.blocks {
            *counts.entry(block.data.kind_label()).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a SimaProCsv {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Configuration plus the warn-once state of one parse
#[derive(Debug, Clone)]
pub struct ParseSession {
    config: ParseConfig,
    warned_units: HashSet<String>,
    warned_references: HashSet<String>,
}

impl ParseSession {
    pub fn new(config: ParseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            warned_units: HashSet::new(),
            warned_references: HashSet::new(),
        })
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Unknown unit names reported so far
    pub fn warned_units(&self) -> &HashSet<String> {
        &self.warned_units
    }

    /// Missing literature references reported so far
    pub fn warned_references(&self) -> &HashSet<String> {
        &self.warned_references
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<SimaProCsv> {
        info!("Parsing SimaPro CSV file {}", path.display());
        let text = read_file(path)?;
        self.parse_str(&text)
    }

    pub fn parse_str(&mut self, text: &str) -> Result<SimaProCsv> {
        let (preamble, body) = split_preamble(text);
        let header = parse_header(&preamble)?;
        let database_name = self.database_name(&header)?;
        info!(
            "Reading SimaPro {} {} export '{}'",
            header.simapro_version,
            header.kind,
            database_name.as_deref().unwrap_or("(not given)")
        );

        let context = BlockContext::from_header(&header)?;
        let mut blocks = self.parse_blocks(body, preamble.len() + 1, &header, &context)?;
        info!("Parsed {} blocks", blocks.len());

        if self.config.resolve_parameters && header.kind.has_inventory() {
            let mut resolver =
                ParameterResolver::new(context.numbers.clone(), self.config.parameter_prefix.as_str());
            resolver.resolve_blocks(&mut blocks)?;
        } else {
            // Only literal amounts are final without resolution
            for process in blocks.iter_mut().filter_map(Block::as_process_mut) {
                for exchange in process.all_exchanges_mut() {
                    if exchange.formula.is_none() {
                        attach_uncertainty(exchange, &context.numbers)?;
                    }
                }
            }
        }

        if self.config.normalize_units {
            UnitRegistry::from_blocks(&blocks).normalize_blocks(&mut blocks, &mut self.warned_units);
        }
        if self.config.supplement_biosphere {
            supplement_biosphere(&mut blocks);
        }
        link_literature(&mut blocks, &mut self.warned_references);

        Ok(SimaProCsv {
            header,
            database_name,
            blocks,
        })
    }

    fn database_name(&self, header: &Header) -> Result<Option<String>> {
        let name = self.config.database_name.clone().or_else(|| {
            header
                .project
                .clone()
                .filter(|project| !project.trim().is_empty())
        });
        if name.is_none() && header.kind.has_inventory() {
            return Err(SimaProError::Configuration {
                message: format!(
                    "A database name is required for {} exports; none was given and the header has no project",
                    header.kind
                ),
            });
        }
        Ok(name)
    }

    fn parse_blocks(
        &self,
        body: &str,
        first_line_no: usize,
        header: &Header,
        context: &BlockContext,
    ) -> Result<Vec<Block>> {
        let rows = split_rows(body, header.delimiter, first_line_no)?;
        let source = RowSource::new(rows.into_iter(), self.config.clean_cells);
        let mut segmenter = Segmenter::new(source);

        let mut blocks = Vec::new();
        while let Some(segment) = segmenter.next_segment()? {
            let Segment::Block { kind, span, rows } = segment else {
                continue;
            };
            debug!("Parsing {:?} block on lines {}-{}", kind, span.start, span.end);
            let data = parse_block(kind, &rows, context)?;
            blocks.push(Block { span, data });
        }
        debug!(
            "Segmented {} blocks; blocks {} closed with 'End'",
            blocks.len(),
            if segmenter.uses_end_sentinel() { "are" } else { "aren't" }
        );
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockData, ExportKind};

    const METHODS: &str = "\
{SimaPro 9.5.0.0}
{methods}
{Date: 13/10/2023}
{Time: 14:02:11}
{CSV separator: Semicolon}
{Decimal separator: .}

Method

Name
Test method

End

Units
kg;Mass;1;kg
End
";

    #[test]
    fn test_methods_export_needs_no_database_name() {
        let parsed = SimaProCsv::parse_str(METHODS, ParseConfig::default()).unwrap();
        assert_eq!(parsed.header.kind, ExportKind::Methods);
        assert_eq!(parsed.database_name, None);
        assert_eq!(parsed.blocks.len(), 2);
        assert!(matches!(parsed.blocks[0].data, BlockData::Method(_)));
        assert_eq!(parsed.blocks[0].span.start, 8);
        assert_eq!(parsed.block_counts().get("Units"), Some(&1));
    }

    #[test]
    fn test_processes_export_requires_database_name() {
        let text = METHODS.replace("{methods}", "{processes}");
        let err = SimaProCsv::parse_str(&text, ParseConfig::default()).unwrap_err();
        assert!(matches!(err, SimaProError::Configuration { .. }));

        let parsed =
            SimaProCsv::parse_str(&text, ParseConfig::default().with_database_name("test db"))
                .unwrap();
        assert_eq!(parsed.database_name.as_deref(), Some("test db"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ParseConfig::default().with_parameter_prefix("1-bad");
        assert!(matches!(
            ParseSession::new(config),
            Err(SimaProError::Configuration { .. })
        ));
    }
}
