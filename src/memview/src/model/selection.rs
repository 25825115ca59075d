//! On-screen selections within one column group.
//!
//! Byte ranges map onto text columns with starts rounded up and ends rounded
//! down, so a selection never covers part of a neighbouring item.

use super::layout::{ColumnRange, BYTES_PER_ROW};
use crate::range::ByteRange;

const ROW: usize = BYTES_PER_ROW as usize;

/// A rectangular-by-rows span of text inside one column group.
///
/// Runs from `(start_row, start_col)` to `(end_row, end_col)`; `end_col` is
/// exclusive. Middle rows cover the whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub column: ColumnRange,
    pub start_row: u64,
    pub start_col: usize,
    pub end_row: u64,
    pub end_col: usize,
}

impl Selection {
    /// Build a selection between two points in either order, with the
    /// columns clamped into the group
    pub fn new(column: ColumnRange, a: (u64, usize), b: (u64, usize)) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let clamp = |col: usize| col.clamp(column.from, column.to);
        Self {
            column,
            start_row: start.0,
            start_col: clamp(start.1),
            end_row: end.0,
            end_col: clamp(end.1),
        }
    }

    /// The text covering `range` in `column`, where `range` is relative to
    /// the first byte of `first_row`
    pub fn from_bytes(column: ColumnRange, first_row: u64, range: ByteRange) -> Self {
        let start = range.offset;
        let last = range.end().saturating_sub(1);
        let end_in_row = range.end() - (last / ROW) * ROW;

        let start_col = column.start_column(start % ROW);
        let mut end_col = column.end_column(end_in_row);
        if start / ROW == last / ROW {
            end_col = end_col.max(start_col);
        }

        Self {
            column,
            start_row: first_row + (start / ROW) as u64,
            start_col,
            end_row: first_row + (last / ROW) as u64,
            end_col,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_row == self.end_row && self.start_col >= self.end_col
    }

    pub fn row_count(&self) -> u64 {
        self.end_row - self.start_row + 1
    }

    /// Columns `[from, to)` selected on `row`
    pub fn columns_on_row(&self, row: u64) -> Option<(usize, usize)> {
        if row < self.start_row || row > self.end_row {
            return None;
        }
        let from = if row == self.start_row {
            self.start_col
        } else {
            self.column.from
        };
        let to = if row == self.end_row {
            self.end_col
        } else {
            self.column.to
        };
        Some((from, to.max(from)))
    }

    pub fn contains(&self, row: u64, col: usize) -> bool {
        self.columns_on_row(row)
            .is_some_and(|(from, to)| col >= from && col < to)
    }
}
