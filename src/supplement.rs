//! Cross-block enrichment of process data
//!
//! Trailing flow lists and `Literature reference` blocks hold details that
//! processes only refer to by name. These passes copy them onto the
//! processes once every block is parsed.

use crate::constants::{FIELD_JOINER, LITERATURE_REFERENCES_KEY, context_for_flow_list};
use crate::models::{Block, BlockData, FlowDefinition, Metadata, MetadataValue, ProcessSection};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Copy CAS numbers and comments from flow lists onto matching process edges
///
/// Edges match by name inside the process section that corresponds to the
/// flow list category. Returns the number of edges updated.
pub fn supplement_biosphere(blocks: &mut [Block]) -> usize {
    let flow_lists: Vec<(ProcessSection, HashMap<String, FlowDefinition>)> = blocks
        .iter()
        .filter_map(|block| match &block.data {
            BlockData::FlowList(list) => {
                let section = context_for_flow_list(&list.category)
                    .and_then(ProcessSection::from_label)?;
                let flows = list
                    .flows
                    .iter()
                    .map(|flow| (flow.name.clone(), flow.clone()))
                    .collect();
                Some((section, flows))
            }
            _ => None,
        })
        .collect();
    if flow_lists.is_empty() {
        return 0;
    }

    let mut updated = 0;
    for process in blocks.iter_mut().filter_map(Block::as_process_mut) {
        for (section, flows) in &flow_lists {
            let Some(edges) = process.exchanges_mut(*section) else {
                continue;
            };
            for edge in edges.iter_mut() {
                let Some(flow) = flows.get(&edge.name) else {
                    continue;
                };
                if flow.cas_number.is_some() {
                    edge.cas_number = flow.cas_number.clone();
                }
                if !flow.comment.is_empty() {
                    if !edge.comment.is_empty() {
                        edge.comment.push_str(FIELD_JOINER);
                    }
                    edge.comment.push_str(&flow.comment);
                }
                updated += 1;
            }
        }
    }
    debug!("Supplemented {} biosphere edges from flow lists", updated);
    updated
}

/// Attach `Literature reference` blocks to the process entries naming them
///
/// Links to missing references are skipped: they stay in the process
/// metadata as written, with `resolved` left empty. Each missing name is
/// reported once per `warned` set.
pub fn link_literature(blocks: &mut [Block], warned: &mut HashSet<String>) {
    let references: HashMap<String, Metadata> = blocks
        .iter()
        .filter_map(|block| match &block.data {
            BlockData::LiteratureReference(metadata) => metadata
                .get_text("Name")
                .map(|name| (name.to_string(), metadata.clone())),
            _ => None,
        })
        .collect();

    for process in blocks.iter_mut().filter_map(Block::as_process_mut) {
        let line_no = process.line_no;
        let Some(MetadataValue::References(links)) =
            process.metadata.get_mut(LITERATURE_REFERENCES_KEY)
        else {
            continue;
        };
        for link in links.iter_mut() {
            match references.get(&link.reference) {
                Some(metadata) => link.resolved = Some(metadata.clone()),
                None => {
                    if warned.insert(link.reference.clone()) {
                        warn!(
                            "Process on line {} cites missing literature reference '{}'",
                            line_no, link.reference
                        );
                    }
                }
            }
        }
    }
}
