//! Mock Memory Source
//!
//! A scriptable memory source for testing the cache and the renderers.

use super::{MemorySource, RawMemoryInfo};
use crate::error::{FetchError, FetchResult};
use crate::range::{AddressRange, ByteRange};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// A mock memory source with fetch accounting
pub struct MockMemorySource {
    /// Raw memory data (contiguous, starting at base_address)
    pub data: Vec<u8>,
    /// Base virtual address for the data
    pub base_address: u64,
    observed: Vec<AddressRange>,
    reads: Vec<AddressRange>,
    writes: Vec<AddressRange>,
    failures: Mutex<Vec<(AddressRange, FetchError)>>,
    calls: Mutex<Vec<(u64, u32)>>,
    fetches: AtomicUsize,
    /// When present, fetches stay pending until the gate opens
    gate: Option<watch::Sender<bool>>,
}

impl MockMemorySource {
    /// Create a new mock with fully observed data at given base address
    pub fn new(data: Vec<u8>, base_address: u64) -> Self {
        let observed = AddressRange::with_len(base_address, data.len() as u64)
            .into_iter()
            .collect();
        Self {
            data,
            base_address,
            observed,
            reads: Vec::new(),
            writes: Vec::new(),
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Replace the observed regions (everything else is unknown)
    pub fn with_observed(mut self, observed: Vec<AddressRange>) -> Self {
        self.observed = observed;
        self
    }

    pub fn with_reads(mut self, reads: Vec<AddressRange>) -> Self {
        self.reads = reads;
        self
    }

    pub fn with_writes(mut self, writes: Vec<AddressRange>) -> Self {
        self.writes = writes;
        self
    }

    /// Hold every fetch pending until [`release`](Self::release) is called
    pub fn gated(mut self) -> Self {
        self.gate = Some(watch::channel(false).0);
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.send_replace(true);
        }
    }

    /// Fail any fetch overlapping `range` with `error`
    pub fn fail_range(&self, range: AddressRange, error: FetchError) {
        self.failures.lock().push((range, error));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Number of fetch calls made so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// `(address, count)` of every fetch call, in call order
    pub fn calls(&self) -> Vec<(u64, u32)> {
        self.calls.lock().clone()
    }

    fn relative(ranges: &[AddressRange], request: &AddressRange) -> Vec<ByteRange> {
        ranges
            .iter()
            .filter_map(|r| r.intersect(request))
            .map(|r| {
                ByteRange::new(
                    (r.start - request.start) as usize,
                    r.last_offset() as usize + 1,
                )
            })
            .collect()
    }

    fn respond(&self, address: u64, count: u32) -> FetchResult<RawMemoryInfo> {
        let Some(request) = AddressRange::with_len(address, u64::from(count)) else {
            return Ok(RawMemoryInfo::default());
        };

        let failures = self.failures.lock();
        if let Some((_, error)) = failures.iter().find(|(r, _)| r.intersect(&request).is_some()) {
            return Err(error.clone());
        }
        drop(failures);

        let mut data = vec![0u8; count as usize];
        for (i, byte) in data.iter_mut().enumerate() {
            let addr = address + i as u64;
            if let Some(index) = addr.checked_sub(self.base_address) {
                if let Some(value) = self.data.get(index as usize) {
                    *byte = *value;
                }
            }
        }

        Ok(RawMemoryInfo {
            data,
            observed: Self::relative(&self.observed, &request),
            reads: Self::relative(&self.reads, &request),
            writes: Self::relative(&self.writes, &request),
        })
    }
}

impl MemorySource for MockMemorySource {
    fn fetch(&self, address: u64, count: u32) -> BoxFuture<'static, FetchResult<RawMemoryInfo>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push((address, count));

        let result = self.respond(address, count);
        let gate = self.gate.as_ref().map(watch::Sender::subscribe);

        async move {
            if let Some(mut gate) = gate {
                if gate.wait_for(|open| *open).await.is_err() {
                    return Err(FetchError::Cancelled);
                }
            }
            result
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_fetch_bytes() {
        let source = MockMemorySource::new(vec![0x41, 0x42, 0x43, 0x44], 0x1000);

        let info = source.fetch(0x1001, 2).await.unwrap();
        assert_eq!(info.data, vec![0x42, 0x43]);
        assert_eq!(info.observed, vec![ByteRange::new(0, 2)]);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_outside_data_is_unobserved() {
        let source = MockMemorySource::new(vec![0x41, 0x42, 0x43, 0x44], 0x1000);

        let info = source.fetch(0x1002, 4).await.unwrap();
        assert_eq!(info.data, vec![0x43, 0x44, 0, 0]);
        assert_eq!(info.observed, vec![ByteRange::new(0, 2)]);
    }

    #[tokio::test]
    async fn test_mock_source_provenance_is_relative() {
        let source = MockMemorySource::new(vec![0; 0x100], 0x1000)
            .with_reads(vec![AddressRange::new(0x1010, 0x1013).unwrap()])
            .with_writes(vec![AddressRange::new(0x10f0, 0x1200).unwrap()]);

        let info = source.fetch(0x1008, 0x10).await.unwrap();
        assert_eq!(info.reads, vec![ByteRange::new(8, 4)]);
        assert!(info.writes.is_empty());
    }

    #[tokio::test]
    async fn test_mock_source_injected_failure() {
        let source = MockMemorySource::new(vec![0; 0x100], 0x1000);
        source.fail_range(
            AddressRange::new(0x1080, 0x1080).unwrap(),
            FetchError::unexpected("boom"),
        );

        assert!(source.fetch(0x1000, 0x10).await.is_ok());
        assert_eq!(
            source.fetch(0x1000, 0x100).await,
            Err(FetchError::unexpected("boom"))
        );

        source.clear_failures();
        assert!(source.fetch(0x1000, 0x100).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_source_gate_holds_fetch() {
        let source = MockMemorySource::new(vec![1, 2, 3], 0).gated();
        let mut pending = source.fetch(0, 3);

        assert!((&mut pending).now_or_never().is_none());
        source.release();
        assert_eq!(pending.await.unwrap().data, vec![1, 2, 3]);
    }
}
