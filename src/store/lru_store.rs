//! Bounded LRU store with optional expiry.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use serde_json::Value;

use super::entry::StoredValue;
use super::stats::StoreStatistics;
use super::CacheStore;

/// Thread-safe LRU store keyed by string
pub struct LruStore {
    entries: Mutex<LruCache<String, StoredValue>>,

    capacity: NonZeroUsize,

    /// Time-to-live applied to every write
    ttl: Option<Duration>,

    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    removals: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl LruStore {
    /// Creates a store; a zero capacity is raised to one
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    // A panic while holding the lock cannot leave the LRU map half-updated.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, StoredValue>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drops expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, stored)| stored.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        if !expired.is_empty() {
            self.expirations
                .fetch_add(expired.len() as u64, Ordering::Relaxed);
        }
        expired.len()
    }
}

impl CacheStore for LruStore {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();

        if entries.peek(key).is_some_and(StoredValue::is_expired) {
            entries.pop(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match entries.get_mut(key) {
            Some(stored) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(stored.read())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: &str, value: Value) -> Option<Value> {
        let mut entries = self.lock();
        self.puts.fetch_add(1, Ordering::Relaxed);

        match entries.push(key.to_string(), StoredValue::new(value, self.ttl)) {
            // Same key: replacement, not eviction
            Some((old_key, old)) if old_key == key => {
                (!old.is_expired()).then_some(old.value)
            }
            Some(_) => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => None,
        }
    }

    fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.lock().pop(key)?;
        self.removals.fetch_add(1, Ordering::Relaxed);
        (!removed.is_expired()).then_some(removed.value)
    }

    fn contains(&self, key: &str) -> bool {
        self.lock()
            .peek(key)
            .is_some_and(|stored| !stored.is_expired())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn statistics(&self) -> StoreStatistics {
        StoreStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size: self.len(),
            capacity: self.capacity(),
        }
    }
}
