//! Row source with one step of pushback
//!
//! Blocks don't always end with `End`; sometimes the only way to see that a
//! block is over is to read the first row of the next one. The segmenter
//! then hands that row back with [`RowSource::rewind`].

use super::cleaner::clean_cell;
use crate::models::RawRow;

/// Iterator over cleaned rows that can give back the last row it returned
pub struct RowSource<I> {
    rows: I,
    clean_cells: bool,
    pushed_back: Option<RawRow>,
    last: Option<RawRow>,
    line_no: usize,
}

impl<I> RowSource<I>
where
    I: Iterator<Item = RawRow>,
{
    pub fn new(rows: I, clean_cells: bool) -> Self {
        Self {
            rows,
            clean_cells,
            pushed_back: None,
            last: None,
            line_no: 0,
        }
    }

    /// Push back the most recently returned row
    ///
    /// Only one row can be pushed back: a second call before the next
    /// `next()` does nothing, as does a call before any row was read.
    pub fn rewind(&mut self) {
        if let Some(row) = self.last.take() {
            self.pushed_back = Some(row);
        }
    }

    /// Line number of the furthest row read so far
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn clean(&self, mut row: RawRow) -> RawRow {
        if self.clean_cells {
            row.fields = row.fields.iter().map(|field| clean_cell(field)).collect();
        }
        row
    }
}

impl<I> Iterator for RowSource<I>
where
    I: Iterator<Item = RawRow>,
{
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        let row = match self.pushed_back.take() {
            Some(row) => row,
            None => {
                let raw = self.rows.next()?;
                let row = self.clean(raw);
                self.line_no = row.line_no;
                row
            }
        };
        self.last = Some(row.clone());
        Some(row)
    }
}
