//! Row layout: where each column group sits in a fixed-width text row,
//! and the mapping between byte offsets and text columns.

use super::codec::Codec;
use serde::Serialize;

/// Bytes rendered per text row
pub const BYTES_PER_ROW: u64 = 16;

/// Hex digits in the address prefix
pub const CHARS_PER_ADDRESS: usize = 16;

pub const ADDRESS_SEPARATOR: &str = ": ";

/// Width of the address prefix including its separator
pub const ADDRESS_CHARS: usize = CHARS_PER_ADDRESS + ADDRESS_SEPARATOR.len();

/// Extra gap between the hex bytes and the ASCII column
pub const ASCII_SEPARATOR: &str = " ";

const ROW: usize = BYTES_PER_ROW as usize;

/// Semantic column groups a selection can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Address,
    Hex,
    Ascii,
    /// The numeric item area of the integer and float codecs
    Values,
}

/// A column group: text columns `[from, to)` of every row.
///
/// `gap` is the separator that trails each item inside the group (not
/// part of `[from, to)` for the last item). Byte positions map onto the
/// group's pitch, `width + gap`, so every item owns the same share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRange {
    pub kind: ColumnKind,
    pub from: usize,
    pub to: usize,
    gap: usize,
}

impl ColumnRange {
    pub(crate) const fn new(kind: ColumnKind, from: usize, to: usize, gap: usize) -> Self {
        Self { kind, from, to, gap }
    }

    pub fn width(&self) -> usize {
        self.to - self.from
    }

    pub fn contains(&self, col: usize) -> bool {
        col >= self.from && col < self.to
    }

    fn pitch(&self) -> usize {
        self.width() + self.gap
    }

    /// First column of a range starting at byte `byte_in_row` (rounded up)
    pub fn start_column(&self, byte_in_row: usize) -> usize {
        self.from + (self.pitch() * byte_in_row).div_ceil(ROW)
    }

    /// Exclusive end column of a range covering the first `bytes_in_row`
    /// bytes of its last row (rounded down, trailing separator dropped)
    pub fn end_column(&self, bytes_in_row: usize) -> usize {
        (self.from + self.pitch() * bytes_in_row / ROW)
            .saturating_sub(self.gap)
            .clamp(self.from, self.to)
    }

    /// Byte of the row that column `col` belongs to
    pub fn byte_at(&self, col: usize) -> usize {
        (col.saturating_sub(self.from) * ROW / self.pitch()).min(ROW)
    }
}

/// The column groups of one codec, in left-to-right order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    groups: Vec<ColumnRange>,
    line_length: usize,
}

impl RowLayout {
    pub fn for_codec(codec: Codec) -> Self {
        let address = ColumnRange::new(
            ColumnKind::Address,
            0,
            CHARS_PER_ADDRESS,
            ADDRESS_SEPARATOR.len(),
        );

        let pitch = codec.item_chars() + 1;
        let data_end = ADDRESS_CHARS + codec.items_per_row() * pitch - 1;

        let groups = match codec {
            Codec::Bytes => {
                let hex = ColumnRange::new(ColumnKind::Hex, ADDRESS_CHARS, data_end, 1);
                let ascii_from = data_end + 1 + ASCII_SEPARATOR.len();
                let ascii = ColumnRange::new(ColumnKind::Ascii, ascii_from, ascii_from + ROW, 0);
                vec![address, hex, ascii]
            }
            _ => vec![
                address,
                ColumnRange::new(ColumnKind::Values, ADDRESS_CHARS, data_end, 1),
            ],
        };

        let line_length = groups.last().map_or(0, |g| g.to);
        Self {
            groups,
            line_length,
        }
    }

    pub fn groups(&self) -> &[ColumnRange] {
        &self.groups
    }

    pub fn line_length(&self) -> usize {
        self.line_length
    }

    pub fn group(&self, kind: ColumnKind) -> Option<ColumnRange> {
        self.groups.iter().copied().find(|g| g.kind == kind)
    }

    /// Groups that carry data highlights (everything but the address)
    pub fn highlight_groups(&self) -> impl Iterator<Item = &ColumnRange> {
        self.groups.iter().filter(|g| g.kind != ColumnKind::Address)
    }

    /// The group a click at `col` selects.
    ///
    /// Columns between two groups go to the nearer one; on a tie the left
    /// group wins.
    pub fn selectable_region(&self, col: usize) -> Option<ColumnRange> {
        if col >= self.line_length {
            return None;
        }

        let index = self.groups.partition_point(|g| g.from <= col);
        if index == 0 {
            return self.groups.first().copied();
        }

        let left = self.groups[index - 1];
        if col < left.to {
            return Some(left);
        }
        match self.groups.get(index) {
            None => Some(left),
            Some(right) => {
                let to_left = col + 1 - left.to;
                let to_right = right.from - col;
                Some(if to_left <= to_right { left } else { *right })
            }
        }
    }
}
