//! Read-only monitor view over a cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::CacheHandle;
use crate::store::StoreStatistics;

/// Monitor descriptor registered for a managed cache
///
/// Exposes configuration flags and live statistics; it never mutates the
/// cache it observes.
#[derive(Debug, Clone)]
pub struct CacheMonitor {
    cache: CacheHandle,
}

/// Serializable point-in-time view of a [`CacheMonitor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMonitorSnapshot {
    pub cache_name: String,
    /// Scope of the engine instance backing the cache
    pub engine_scope: String,
    pub engine_started_at: DateTime<Utc>,
    pub key_type: String,
    pub value_type: String,
    pub read_through: bool,
    pub write_through: bool,
    pub store_by_value: bool,
    pub statistics_enabled: bool,
    pub management_enabled: bool,
    pub statistics: StoreStatistics,
    pub hit_rate: f64,
}

impl CacheMonitor {
    pub fn new(cache: CacheHandle) -> Self {
        Self { cache }
    }

    pub fn cache_name(&self) -> &str {
        self.cache.name()
    }

    /// When the engine instance backing the cache was provisioned
    pub fn engine_started_at(&self) -> DateTime<Utc> {
        self.cache.engine().started_at()
    }

    pub fn key_type(&self) -> &str {
        self.cache.key_type().name()
    }

    pub fn value_type(&self) -> &str {
        self.cache.value_type().name()
    }

    pub fn is_read_through(&self) -> bool {
        self.cache.configuration().read_through
    }

    pub fn is_write_through(&self) -> bool {
        self.cache.configuration().write_through
    }

    pub fn is_store_by_value(&self) -> bool {
        self.cache.configuration().store_by_value
    }

    pub fn is_statistics_enabled(&self) -> bool {
        self.cache.configuration().statistics_enabled
    }

    pub fn is_management_enabled(&self) -> bool {
        self.cache.configuration().management_enabled
    }

    pub fn statistics(&self) -> StoreStatistics {
        self.cache.statistics()
    }

    pub fn snapshot(&self) -> CacheMonitorSnapshot {
        let statistics = self.statistics();
        CacheMonitorSnapshot {
            cache_name: self.cache_name().to_string(),
            engine_scope: self.cache.engine().scope().to_string(),
            engine_started_at: self.engine_started_at(),
            key_type: self.key_type().to_string(),
            value_type: self.value_type().to_string(),
            read_through: self.is_read_through(),
            write_through: self.is_write_through(),
            store_by_value: self.is_store_by_value(),
            statistics_enabled: self.is_statistics_enabled(),
            management_enabled: self.is_management_enabled(),
            hit_rate: statistics.hit_rate(),
            statistics,
        }
    }
}
