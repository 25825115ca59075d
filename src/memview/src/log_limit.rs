//! Rate-limited logging of fetch failures.
//!
//! A remote source that keeps failing for the same reason would otherwise
//! produce one warning per page per repaint. Each unique cause is logged at
//! most once per interval; repeats in between are counted and reported with
//! the next line for that cause. Causes not logged for a full interval are
//! forgotten.

use crate::error::FetchError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct CauseState {
    last_logged: Instant,
    suppressed: u64,
}

pub(crate) struct FailureLog {
    interval: Duration,
    causes: Mutex<HashMap<String, CauseState>>,
}

impl FailureLog {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            causes: Mutex::new(HashMap::new()),
        }
    }

    /// Log a failed fetch of `count` bytes at `address`.
    ///
    /// Returns true if a warning was emitted.
    pub fn record(&self, address: u64, count: u32, error: &FetchError) -> bool {
        match error {
            FetchError::DataUnavailable(reason) => {
                tracing::info!("No data for {:#x}+{:#x}: {}", address, count, reason);
                false
            }
            FetchError::Cancelled => {
                tracing::debug!("Fetch of {:#x}+{:#x} cancelled", address, count);
                false
            }
            FetchError::Unexpected(cause) => self.warn(address, count, cause),
        }
    }

    fn warn(&self, address: u64, count: u32, cause: &str) -> bool {
        let now = Instant::now();
        let mut causes = self.causes.lock();

        let suppressed = match causes.get_mut(cause) {
            Some(state) if now.duration_since(state.last_logged) < self.interval => {
                state.suppressed += 1;
                return false;
            }
            Some(state) => {
                let suppressed = state.suppressed;
                state.last_logged = now;
                state.suppressed = 0;
                suppressed
            }
            None => {
                let interval = self.interval;
                causes.retain(|_, state| now.duration_since(state.last_logged) < interval);
                causes.insert(
                    cause.to_string(),
                    CauseState {
                        last_logged: now,
                        suppressed: 0,
                    },
                );
                0
            }
        };
        drop(causes);

        if suppressed > 0 {
            tracing::warn!(
                "Failed to fetch {:#x}+{:#x}: {} ({} similar failures suppressed)",
                address,
                count,
                cause,
                suppressed
            );
        } else {
            tracing::warn!("Failed to fetch {:#x}+{:#x}: {}", address, count, cause);
        }
        true
    }
}
