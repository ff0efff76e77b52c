//! Handles to engine instances and the caches they hold.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::configuration::{CompleteConfiguration, ValueType};
use crate::store::{CacheStore, StoreStatistics};

/// Handle to one provisioned engine instance
///
/// Clones refer to the same instance; equality is instance identity.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    id: Uuid,
    scope: Arc<str>,
    started_at: DateTime<Utc>,
}

impl EngineHandle {
    pub fn new(scope: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope: Arc::from(scope),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl PartialEq for EngineHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EngineHandle {}

impl Hash for EngineHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.scope, self.id)
    }
}

/// Caller-facing handle to a materialized cache
#[derive(Clone)]
pub struct CacheHandle {
    name: Arc<str>,
    configuration: Arc<CompleteConfiguration>,
    engine: EngineHandle,
    store: Arc<dyn CacheStore>,
}

impl CacheHandle {
    pub fn new(
        name: &str,
        configuration: CompleteConfiguration,
        engine: EngineHandle,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            configuration: Arc::new(configuration),
            engine,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &CompleteConfiguration {
        &self.configuration
    }

    pub fn key_type(&self) -> &ValueType {
        &self.configuration.key_type
    }

    pub fn value_type(&self) -> &ValueType {
        &self.configuration.value_type
    }

    /// The engine instance holding this cache
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    pub fn put(&self, key: &str, value: Value) -> Option<Value> {
        self.store.put(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.store.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear()
    }

    pub fn statistics(&self) -> StoreStatistics {
        self.store.statistics()
    }

    /// Checks whether both handles point at the same backing store
    pub fn same_cache(&self, other: &CacheHandle) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.store) as *const (),
            Arc::as_ptr(&other.store) as *const (),
        )
    }
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle")
            .field("name", &self.name)
            .field("engine", &self.engine.to_string())
            .field("key_type", self.key_type())
            .field("value_type", self.value_type())
            .finish()
    }
}
