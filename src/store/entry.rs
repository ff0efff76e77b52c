//! Stored value with expiry bookkeeping.

use std::time::{Duration, Instant};

use serde_json::Value;

/// A value held by an [`LruStore`](super::LruStore)
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: Value,

    pub stored_at: Instant,

    /// Absolute deadline (None = never expires)
    pub expires_at: Option<Instant>,

    /// Reads served from this value
    pub reads: u64,
}

impl StoredValue {
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            stored_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            reads: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Records a read and returns a copy of the value
    pub fn read(&mut self) -> Value {
        self.reads += 1;
        self.value.clone()
    }
}
