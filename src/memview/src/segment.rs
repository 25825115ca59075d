//! Memory Segments
//!
//! An immutable, shareable byte buffer with a parallel "known" bitmap and
//! the read/write provenance ranges reported by the source. Views created
//! by [`MemorySegment::sub_segment`] share the buffer.

use crate::range::{ByteKnowledge, ByteRange};
use crate::source::RawMemoryInfo;
use byteorder::{ByteOrder, LE};
use std::fmt;
use std::sync::Arc;

/// One bit per byte, set iff the byte was observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct KnownBits {
    words: Vec<u64>,
    len: usize,
}

impl KnownBits {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    fn get(&self, index: usize) -> bool {
        index < self.len && (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    fn set(&mut self, index: usize) {
        if index < self.len {
            self.words[index / 64] |= 1 << (index % 64);
        }
    }

    fn set_range(&mut self, range: ByteRange) {
        let Some(range) = range.clip(self.len) else {
            return;
        };
        for index in range.offset..range.end() {
            self.set(index);
        }
    }
}

struct SegmentData {
    data: Vec<u8>,
    known: KnownBits,
    reads: Vec<ByteRange>,
    writes: Vec<ByteRange>,
}

/// A view of `length` bytes starting `offset` bytes into a shared buffer.
#[derive(Clone)]
pub struct MemorySegment {
    inner: Arc<SegmentData>,
    offset: usize,
    length: usize,
}

impl MemorySegment {
    fn from_parts(
        data: Vec<u8>,
        known: KnownBits,
        reads: Vec<ByteRange>,
        writes: Vec<ByteRange>,
    ) -> Self {
        let length = data.len();
        Self {
            inner: Arc::new(SegmentData {
                data,
                known,
                reads,
                writes,
            }),
            offset: 0,
            length,
        }
    }

    /// Build a segment of exactly `length` bytes from a source response.
    ///
    /// Short responses are padded with unknown zero bytes; ranges are clipped
    /// to the segment.
    pub fn from_raw(info: RawMemoryInfo, length: usize) -> Self {
        let RawMemoryInfo {
            mut data,
            observed,
            reads,
            writes,
        } = info;
        data.resize(length, 0);

        let mut known = KnownBits::new(length);
        for range in observed {
            known.set_range(range);
        }

        let clip = |ranges: Vec<ByteRange>| -> Vec<ByteRange> {
            ranges.iter().filter_map(|r| r.clip(length)).collect()
        };

        Self::from_parts(data, known, clip(reads), clip(writes))
    }

    /// A segment where every byte is known
    pub fn fully_known(data: Vec<u8>) -> Self {
        let mut known = KnownBits::new(data.len());
        known.set_range(ByteRange::new(0, data.len()));
        Self::from_parts(data, known, Vec::new(), Vec::new())
    }

    /// A segment of `length` unknown zero bytes
    pub fn unknown(length: usize) -> Self {
        Self::from_parts(vec![0; length], KnownBits::new(length), Vec::new(), Vec::new())
    }

    pub fn empty() -> Self {
        Self::unknown(0)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Raw bytes of this view (unknown bytes included)
    pub fn bytes(&self) -> &[u8] {
        &self.inner.data[self.offset..self.offset + self.length]
    }

    pub fn get(&self, index: usize) -> Option<ByteKnowledge> {
        (index < self.length).then(|| ByteKnowledge {
            value: self.inner.data[self.offset + index],
            known: self.inner.known.get(self.offset + index),
        })
    }

    pub fn is_known(&self, index: usize) -> bool {
        index < self.length && self.inner.known.get(self.offset + index)
    }

    /// True iff every byte of `[start, start + count)` is inside the view and known
    pub fn is_range_known(&self, start: usize, count: usize) -> bool {
        match start.checked_add(count) {
            Some(end) if end <= self.length => (start..end).all(|i| self.is_known(i)),
            _ => false,
        }
    }

    fn slice(&self, start: usize, count: usize) -> Option<&[u8]> {
        let end = start.checked_add(count)?;
        (end <= self.length).then(|| &self.bytes()[start..end])
    }

    pub fn read_u16(&self, index: usize) -> Option<u16> {
        self.slice(index, 2).map(LE::read_u16)
    }

    pub fn read_u32(&self, index: usize) -> Option<u32> {
        self.slice(index, 4).map(LE::read_u32)
    }

    pub fn read_u64(&self, index: usize) -> Option<u64> {
        self.slice(index, 8).map(LE::read_u64)
    }

    /// Read ranges, relative to this view's first byte
    pub fn reads(&self) -> Vec<ByteRange> {
        self.rebase(&self.inner.reads)
    }

    /// Write ranges, relative to this view's first byte
    pub fn writes(&self) -> Vec<ByteRange> {
        self.rebase(&self.inner.writes)
    }

    fn rebase(&self, ranges: &[ByteRange]) -> Vec<ByteRange> {
        ranges
            .iter()
            .filter_map(|r| r.rebase_into(self.offset, self.length))
            .collect()
    }

    /// A view of `count` bytes starting at `start`, clamped to this view.
    /// Shares the underlying buffer.
    pub fn sub_segment(&self, start: usize, count: usize) -> MemorySegment {
        let start = start.min(self.length);
        let count = count.min(self.length - start);
        MemorySegment {
            inner: Arc::clone(&self.inner),
            offset: self.offset + start,
            length: count,
        }
    }

    /// Concatenate segments into one buffer of exactly `total_length` bytes.
    ///
    /// Provenance ranges are re-based by the accumulated length of the
    /// preceding inputs. Inputs beyond `total_length` are truncated; a
    /// shortfall is padded with unknown bytes.
    pub fn combine(segments: &[MemorySegment], total_length: usize) -> MemorySegment {
        let mut data = vec![0; total_length];
        let mut known = KnownBits::new(total_length);
        let mut reads = Vec::new();
        let mut writes = Vec::new();

        let mut position = 0usize;
        for segment in segments {
            if position >= total_length {
                break;
            }
            let take = segment.len().min(total_length - position);

            data[position..position + take].copy_from_slice(&segment.bytes()[..take]);
            for i in (0..take).filter(|&i| segment.is_known(i)) {
                known.set(position + i);
            }

            let place = |r: ByteRange| r.clip(take).map(|r| r.shifted(position));
            reads.extend(segment.reads().into_iter().filter_map(place));
            writes.extend(segment.writes().into_iter().filter_map(place));

            position += segment.len();
        }

        Self::from_parts(data, known, reads, writes)
    }
}

impl fmt::Debug for MemorySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = (0..self.length).filter(|&i| self.is_known(i)).count();
        f.debug_struct("MemorySegment")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("known", &known)
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}
