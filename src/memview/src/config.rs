//! Engine configuration.

use crate::cache::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on resolved page bytes kept in the cache
    pub budget_bytes: u64,
    /// Minimum seconds between two warnings for the same failure cause
    pub error_log_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 64 * 1024 * 1024,
            error_log_interval_secs: 30,
        }
    }
}

impl CacheConfig {
    /// Number of resolved pages the budget allows (at least one)
    pub fn page_budget(&self) -> usize {
        usize::try_from(self.budget_bytes / PAGE_SIZE)
            .unwrap_or(usize::MAX)
            .max(1)
    }

    pub fn error_log_interval(&self) -> Duration {
        Duration::from_secs(self.error_log_interval_secs)
    }
}
