//! Page table for the paged fetch cache.
//!
//! Maps page index to the shared fetch task for that page. Resolved pages
//! are bounded by a page budget and evicted least-recently-used first,
//! using a monotonic access counter. Pending pages are never evicted: they
//! are what lets concurrent requests for one page share a single fetch.
//! Pages touched by the most recent request of a resolving page are kept
//! too, so a span wider than the budget still renders once it has loaded.
//!
//! The table itself is not synchronized; the owner wraps it in a mutex that
//! both the render path and the fetch completion path take.

use crate::segment::MemorySegment;
use crate::task::FetchTask;
use std::collections::HashMap;

/// Size of one page, the unit of fetch and cache
pub const PAGE_SIZE: u64 = 65536;

struct PageEntry {
    task: FetchTask<MemorySegment>,
    /// Distinguishes a re-fetch from the entry it replaced
    id: u64,
    last_access: u64,
    /// Request that last touched this page
    request: u64,
    resolved: bool,
}

pub(crate) struct PageTable {
    entries: HashMap<u64, PageEntry>,
    budget: usize,
    access_counter: u64,
    next_id: u64,
    request: u64,
}

impl PageTable {
    pub fn new(budget: usize) -> Self {
        Self {
            entries: HashMap::new(),
            budget: budget.max(1),
            access_counter: 0,
            next_id: 0,
            request: 0,
        }
    }

    /// Start a new request; pages looked up or inserted until the next call
    /// belong to it
    pub fn begin_request(&mut self) {
        self.request += 1;
    }

    fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    /// Look up the task for `page`.
    ///
    /// A page whose fetch failed with a retryable error is handed out this
    /// once and then forgotten, so the following request fetches it again.
    pub fn lookup(&mut self, page: u64) -> Option<FetchTask<MemorySegment>> {
        let now = self.tick();
        let entry = self.entries.get_mut(&page)?;
        entry.last_access = now;
        entry.request = self.request;
        let task = entry.task.clone();

        if matches!(task.peek(), Some(Err(ref err)) if err.is_retryable()) {
            self.entries.remove(&page);
        }
        Some(task)
    }

    /// Register a freshly issued fetch. `issue` receives the entry id the
    /// completion path must quote back to [`mark_resolved`](Self::mark_resolved).
    pub fn insert<F>(&mut self, page: u64, issue: F) -> (u64, FetchTask<MemorySegment>)
    where
        F: FnOnce(u64) -> FetchTask<MemorySegment>,
    {
        let now = self.tick();
        let id = self.next_id;
        self.next_id += 1;

        let task = issue(id);
        self.entries.insert(
            page,
            PageEntry {
                task: task.clone(),
                id,
                last_access: now,
                request: self.request,
                resolved: false,
            },
        );
        (id, task)
    }

    /// Mark the fetch `id` for `page` complete and trim resolved pages to
    /// the budget, keeping the pages of the request that last touched
    /// `page`. Returns the evicted page indices.
    pub fn mark_resolved(&mut self, page: u64, id: u64) -> Vec<u64> {
        let request = match self.entries.get_mut(&page) {
            Some(entry) if entry.id == id => {
                entry.resolved = true;
                entry.request
            }
            _ => return Vec::new(),
        };
        self.enforce_budget(request)
    }

    fn enforce_budget(&mut self, keep: u64) -> Vec<u64> {
        let mut evicted = Vec::new();
        loop {
            let resolved = self.entries.values().filter(|e| e.resolved).count();
            if resolved <= self.budget {
                return evicted;
            }
            let oldest = self
                .entries
                .iter()
                .filter(|(_, e)| e.resolved && e.request != keep)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(page, _)| *page);
            match oldest {
                Some(page) => {
                    self.entries.remove(&page);
                    evicted.push(page);
                }
                None => return evicted,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
