//! In-process data stores backing locally materialized caches.
//!
//! The registry itself never touches cache data: a [`CacheHandle`] hands out
//! a [`CacheStore`] trait object owned by the engine instance.
//!
//! [`CacheHandle`]: crate::engine::CacheHandle

pub mod entry;
pub mod lru_store;
pub mod stats;

pub use entry::StoredValue;
pub use lru_store::LruStore;
pub use stats::StoreStatistics;

use serde_json::Value;

/// Data operations of a materialized cache
pub trait CacheStore: Send + Sync {
    /// Reads a value, `None` on miss or expiry
    fn get(&self, key: &str) -> Option<Value>;

    /// Writes a value, returning the previous one
    fn put(&self, key: &str, value: Value) -> Option<Value>;

    fn remove(&self, key: &str) -> Option<Value>;

    fn contains(&self, key: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);

    /// Point-in-time statistics for monitoring
    fn statistics(&self) -> StoreStatistics;
}
