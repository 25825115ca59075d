//! Memory Source Trait
//!
//! Core abstraction for fetching remote memory.

use crate::error::FetchResult;
use crate::range::ByteRange;
use futures::future::BoxFuture;

/// A source response for `count` bytes at some address.
///
/// All ranges are relative to the fetched address. `data` may be shorter
/// than requested; missing bytes are unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMemoryInfo {
    pub data: Vec<u8>,
    /// Ranges whose bytes were actually observed during capture
    pub observed: Vec<ByteRange>,
    pub reads: Vec<ByteRange>,
    pub writes: Vec<ByteRange>,
}

impl RawMemoryInfo {
    /// A response where every returned byte was observed
    pub fn fully_observed(data: Vec<u8>) -> Self {
        let observed = vec![ByteRange::new(0, data.len())];
        Self {
            data,
            observed,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }
}

/// Trait for fetching memory from a remote or on-disk image.
///
/// Implementations must not block the caller: the returned future carries
/// the work and is driven on the engine's runtime.
pub trait MemorySource: Send + Sync {
    /// Fetch `count` bytes starting at `address`.
    ///
    /// Fails with [`FetchError::DataUnavailable`](crate::FetchError::DataUnavailable)
    /// when the source cannot supply the range at all.
    fn fetch(&self, address: u64, count: u32) -> BoxFuture<'static, FetchResult<RawMemoryInfo>>;
}
