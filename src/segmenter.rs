//! Block segmentation
//!
//! Groups rows into blocks. A block starts with a keyword row and ends at
//! an `End` row (consumed), at the next control keyword (handed back to the
//! row source) or at end of input.
//!
//! Trailing flow lists such as `Airborne emissions` use keywords that also
//! name sections inside processes. They're only accepted as new blocks once
//! the file has shown that it closes blocks with `End`; otherwise there's no
//! way to tell a new block from a process section.

use crate::blocks::{BlockKind, is_control_keyword};
use crate::constants::END_SENTINEL;
use crate::error::{Result, SimaProError};
use crate::models::{LineSpan, RawRow};
use crate::reader::RowSource;
use tracing::debug;

/// One unit of segmenter output
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A lone `End` row outside any block
    Sentinel { line_no: usize },
    Block {
        kind: BlockKind,
        span: LineSpan,
        /// Body rows, keyword row excluded
        rows: Vec<RawRow>,
    },
}

/// True for a row holding only `End`
pub fn is_sentinel(row: &RawRow) -> bool {
    row.first() == END_SENTINEL && row.non_empty_from(1).is_empty()
}

pub struct Segmenter<I> {
    source: RowSource<I>,
    uses_end_sentinel: bool,
}

impl<I> Segmenter<I>
where
    I: Iterator<Item = RawRow>,
{
    pub fn new(source: RowSource<I>) -> Self {
        Self {
            source,
            uses_end_sentinel: false,
        }
    }

    /// Whether an `End` row has been seen so far
    pub fn uses_end_sentinel(&self) -> bool {
        self.uses_end_sentinel
    }

    /// Next sentinel or non-empty block; `None` at end of input
    pub fn next_segment(&mut self) -> Result<Option<Segment>> {
        loop {
            let Some(row) = self.source.next() else {
                return Ok(None);
            };
            if row.is_blank() {
                continue;
            }
            if is_sentinel(&row) {
                self.uses_end_sentinel = true;
                return Ok(Some(Segment::Sentinel {
                    line_no: row.line_no,
                }));
            }

            let keyword = row.first();
            let Some(kind) = BlockKind::from_keyword(keyword) else {
                return Err(SimaProError::UnknownBlock {
                    keyword: keyword.to_string(),
                    line_no: row.line_no,
                });
            };
            if kind.is_indeterminate() && !self.uses_end_sentinel {
                return Err(SimaProError::IndeterminateBlockEnd {
                    keyword: keyword.to_string(),
                    line_no: row.line_no,
                });
            }

            let (rows, end) = self.accumulate_body(row.line_no);
            if rows.iter().all(RawRow::is_blank) {
                debug!("Dropping empty '{}' block on line {}", keyword, row.line_no);
                continue;
            }

            return Ok(Some(Segment::Block {
                kind,
                span: LineSpan {
                    start: row.line_no,
                    end,
                },
                rows,
            }));
        }
    }

    /// Collect body rows; returns them with the last line the block used
    fn accumulate_body(&mut self, start: usize) -> (Vec<RawRow>, usize) {
        let mut rows = Vec::new();
        let mut end = start;

        while let Some(row) = self.source.next() {
            if is_sentinel(&row) {
                self.uses_end_sentinel = true;
                end = row.line_no;
                break;
            }
            if is_control_keyword(row.first()) {
                self.source.rewind();
                break;
            }
            end = row.line_no;
            rows.push(row);
        }

        (rows, end)
    }
}

impl<I> Iterator for Segmenter<I>
where
    I: Iterator<Item = RawRow>,
{
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_segment().transpose()
    }
}
