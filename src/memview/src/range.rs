//! Address and Byte Range Types
//!
//! Primitives shared by every layer: absolute address windows, relative
//! byte ranges, and per-byte knowledge.

/// An inclusive window of the 64-bit address space.
///
/// The end is stored inclusively so the full space `[0, u64::MAX]` is
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    pub start: u64,
    pub last: u64,
}

impl AddressRange {
    /// Create a window, returning `None` if `last < start`
    pub fn new(start: u64, last: u64) -> Option<Self> {
        (start <= last).then_some(Self { start, last })
    }

    /// Create a window from a start address and a non-zero length
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        let last = start.checked_add(len.checked_sub(1)?)?;
        Some(Self { start, last })
    }

    /// Largest valid offset relative to `start`
    pub fn last_offset(&self) -> u64 {
        self.last - self.start
    }

    /// Number of bytes in the window (may be 2^64)
    pub fn len(&self) -> u128 {
        u128::from(self.last_offset()) + 1
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address <= self.last
    }

    /// Intersection with another window
    pub fn intersect(&self, other: &AddressRange) -> Option<AddressRange> {
        AddressRange::new(self.start.max(other.start), self.last.min(other.last))
    }
}

/// A `(offset, size)` range relative to some base (a fetch address or a
/// segment's first byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteRange {
    pub offset: usize,
    pub size: usize,
}

impl ByteRange {
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Clip to `[0, limit)`, returning `None` if nothing remains
    pub fn clip(&self, limit: usize) -> Option<ByteRange> {
        let end = self.end().min(limit);
        (self.offset < end).then(|| ByteRange::new(self.offset, end - self.offset))
    }

    /// Re-express this range relative to a base `start` bytes further in,
    /// keeping only the part inside `[start, start + len)`.
    pub fn rebase_into(&self, start: usize, len: usize) -> Option<ByteRange> {
        let from = self.offset.max(start);
        let to = self.end().min(start.saturating_add(len));
        (from < to).then(|| ByteRange::new(from - start, to - from))
    }

    /// Shift forward by `delta` bytes
    pub fn shifted(&self, delta: usize) -> ByteRange {
        ByteRange::new(self.offset.saturating_add(delta), self.size)
    }
}

/// A byte value together with whether it was ever observed.
///
/// Unknown bytes still carry a value (usually zero) which some renderings
/// display as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteKnowledge {
    pub value: u8,
    pub known: bool,
}
