//! Store statistics exposed through cache monitors.

use serde::{Deserialize, Serialize};

/// Counters of a single store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub hits: u64,

    pub misses: u64,

    pub puts: u64,

    pub removals: u64,

    /// Entries dropped because the store was full
    pub evictions: u64,

    pub expirations: u64,

    /// Current number of entries
    pub size: usize,

    pub capacity: usize,
}

impl StoreStatistics {
    /// Hit rate in 0.0..=1.0
    pub fn hit_rate(&self) -> f64 {
        let total = self.gets();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn gets(&self) -> u64 {
        self.hits + self.misses
    }
}
