//! Paged Fetch Cache
//!
//! [`MemoryDataModel`] is an address window over a [`MemorySource`]. Byte
//! ranges are split into fixed [`PAGE_SIZE`] page fetches, each fetched once
//! and shared through the page table, then stitched back into a single
//! [`MemorySegment`].

use crate::cache::{PageTable, PAGE_SIZE};
use crate::config::CacheConfig;
use crate::error::FetchResult;
use crate::log_limit::FailureLog;
use crate::range::AddressRange;
use crate::segment::MemorySegment;
use crate::source::MemorySource;
use crate::task::FetchTask;

use futures::future::join_all;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// State shared by a data model and all of its aligned views
struct PagedMemory {
    source: Arc<dyn MemorySource>,
    window: AddressRange,
    runtime: Handle,
    pages: Mutex<PageTable>,
    failures: FailureLog,
}

impl PagedMemory {
    /// The shared tasks for pages `first..=last`, issuing fetches on a miss.
    /// The pages are looked up as one request.
    fn pages(self: &Arc<Self>, first: u64, last: u64) -> Vec<FetchTask<MemorySegment>> {
        let mut pages = self.pages.lock();
        pages.begin_request();
        (first..=last)
            .map(|index| self.page(&mut pages, index))
            .collect()
    }

    /// The shared task for page `index`, issuing the fetch on a miss
    fn page(self: &Arc<Self>, pages: &mut PageTable, index: u64) -> FetchTask<MemorySegment> {
        if let Some(task) = pages.lookup(index) {
            return task;
        }

        let page_offset = index * PAGE_SIZE;
        let address = self.window.start + page_offset;
        // At most PAGE_SIZE, so it fits a u32
        let count = (self.window.last_offset() - page_offset).min(PAGE_SIZE - 1) as u32 + 1;

        tracing::debug!("Fetching page {} ({:#x}+{:#x})", index, address, count);

        let fetch = self.source.fetch(address, count);
        let memory: Weak<PagedMemory> = Arc::downgrade(self);
        let runtime = &self.runtime;

        // Inserted before the lock is released, so the completion path
        // always finds its entry (or a newer one).
        let (_, task) = pages.insert(index, |id| {
            FetchTask::spawn(runtime, async move {
                let result = fetch
                    .await
                    .map(|info| MemorySegment::from_raw(info, count as usize));
                if let Some(memory) = memory.upgrade() {
                    memory.page_resolved(index, id, address, count, &result);
                }
                result
            })
            .0
        });
        task
    }

    /// Completion path: runs on the runtime, off the render context
    fn page_resolved(
        &self,
        index: u64,
        id: u64,
        address: u64,
        count: u32,
        result: &FetchResult<MemorySegment>,
    ) {
        if let Err(err) = result {
            self.failures.record(address, count, err);
        }

        let evicted = self.pages.lock().mark_resolved(index, id);
        if !evicted.is_empty() {
            tracing::debug!("Evicted pages {:?}", evicted);
        }
    }
}

/// A byte-addressable window over a memory source, backed by a shared
/// page cache.
///
/// Cloning is cheap; clones and [`align`](Self::align)ed views share the
/// same cache. The cache lives as long as the last view of it.
#[derive(Clone)]
pub struct MemoryDataModel {
    memory: Arc<PagedMemory>,
    alignment: u64,
}

impl MemoryDataModel {
    pub fn new(source: Arc<dyn MemorySource>, window: AddressRange, runtime: Handle) -> Self {
        Self::with_config(source, window, runtime, &CacheConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn MemorySource>,
        window: AddressRange,
        runtime: Handle,
        config: &CacheConfig,
    ) -> Self {
        Self {
            memory: Arc::new(PagedMemory {
                source,
                window,
                runtime,
                pages: Mutex::new(PageTable::new(config.page_budget())),
                failures: FailureLog::new(config.error_log_interval()),
            }),
            alignment: 1,
        }
    }

    /// First address of the window
    pub fn address(&self) -> u64 {
        self.memory.window.start
    }

    /// Last address of the window (inclusive)
    pub fn last_address(&self) -> u64 {
        self.memory.window.last
    }

    pub fn window(&self) -> AddressRange {
        self.memory.window
    }

    pub fn runtime(&self) -> &Handle {
        &self.memory.runtime
    }

    /// Item width this view keeps boundaries aligned to
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// A view whose item boundaries fall on multiples of `byte_width`.
    ///
    /// Fetching is unchanged (same window, same cache); only the item
    /// arithmetic differs. Aligning twice to the same width is a no-op.
    pub fn align(&self, byte_width: u64) -> MemoryDataModel {
        MemoryDataModel {
            memory: Arc::clone(&self.memory),
            alignment: lcm(self.alignment, byte_width.max(1)),
        }
    }

    /// Number of pages currently held by the cache
    pub fn cached_pages(&self) -> usize {
        self.memory.pages.lock().len()
    }

    /// Fetch `length` bytes at `offset` (relative to the window start).
    ///
    /// The range is clamped to the window. Never blocks: the returned task
    /// may still be pending.
    pub fn get(&self, offset: u64, length: usize) -> FetchTask<MemorySegment> {
        self.resolve(offset, length).0
    }

    /// Speculative fetch the caller may cancel.
    ///
    /// Cancelling aborts only this request's private continuation; page
    /// fetches it shares with other requests keep running.
    pub fn prefetch(&self, offset: u64, length: usize) -> Prefetch {
        let (task, abort) = self.resolve(offset, length);
        Prefetch { task, abort }
    }

    /// Clamp `(offset, length)` to the window
    fn clamp(&self, offset: u64, length: usize) -> (u64, usize) {
        let last_offset = self.memory.window.last_offset();
        let offset = offset.min(last_offset);
        let available = last_offset - offset;
        let length = match usize::try_from(available) {
            Ok(available) => length.min(available.saturating_add(1)),
            Err(_) => length,
        };
        (offset, length)
    }

    fn resolve(&self, offset: u64, length: usize) -> (FetchTask<MemorySegment>, Option<AbortHandle>) {
        if length == 0 {
            return (FetchTask::ready(Ok(MemorySegment::empty())), None);
        }
        let (offset, length) = self.clamp(offset, length);

        let first_page = offset / PAGE_SIZE;
        let last_page = (offset + (length as u64 - 1)) / PAGE_SIZE;
        let start = (offset % PAGE_SIZE) as usize;
        let runtime = &self.memory.runtime;

        let mut pages = self.memory.pages(first_page, last_page);
        if pages.len() == 1 {
            return pages
                .swap_remove(0)
                .map_owned(runtime, move |page| page.sub_segment(start, length));
        }

        if let Some(results) = pages.iter().map(FetchTask::peek).collect::<Option<Vec<_>>>() {
            return (FetchTask::ready(combine_pages(results, start, length)), None);
        }

        let (task, abort) = FetchTask::spawn(runtime, async move {
            let results = join_all(pages.iter().map(|page| page.wait())).await;
            combine_pages(results, start, length)
        });
        (task, Some(abort))
    }
}

/// Stitch consecutive page results into `length` bytes starting `start`
/// bytes into the first page. The first failure in page order wins.
fn combine_pages(
    results: Vec<FetchResult<MemorySegment>>,
    start: usize,
    length: usize,
) -> FetchResult<MemorySegment> {
    let mut segments = results.into_iter().collect::<FetchResult<Vec<_>>>()?;
    if let Some(first) = segments.first_mut() {
        *first = first.sub_segment(start, usize::MAX);
    }
    Ok(MemorySegment::combine(&segments, length))
}

fn lcm(a: u64, b: u64) -> u64 {
    fn gcd(a: u64, b: u64) -> u64 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }
    a / gcd(a, b) * b
}

impl fmt::Debug for MemoryDataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataModel")
            .field("window", &self.memory.window)
            .field("alignment", &self.alignment)
            .field("cached_pages", &self.cached_pages())
            .finish()
    }
}

/// A speculative fetch owned by one caller
#[derive(Debug)]
pub struct Prefetch {
    task: FetchTask<MemorySegment>,
    abort: Option<AbortHandle>,
}

impl Prefetch {
    pub fn task(&self) -> &FetchTask<MemorySegment> {
        &self.task
    }

    /// Drop interest in the result. Shared page fetches are not cancelled.
    pub fn cancel(self) {
        if let Some(abort) = self.abort {
            abort.abort();
        }
    }
}
