//! In-process engine backed by LRU stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::handle::{CacheHandle, EngineHandle};
use super::Engine;
use crate::configuration::CompleteConfiguration;
use crate::store::{CacheStore, LruStore};

const DEFAULT_CAPACITY: usize = 10_000;

struct LocalInstance {
    handle: EngineHandle,
    caches: HashMap<String, CacheHandle>,
    running: bool,
    shutdown_calls: usize,
}

/// Engine that keeps every instance inside the current process
///
/// Failure switches make it usable as a test double for provisioning and
/// shutdown errors.
pub struct LocalEngine {
    instances: DashMap<Uuid, LocalInstance>,
    default_capacity: usize,
    fail_provision: AtomicBool,
    fail_shutdown: AtomicBool,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngine {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
            default_capacity: DEFAULT_CAPACITY,
            fail_provision: AtomicBool::new(false),
            fail_shutdown: AtomicBool::new(false),
        }
    }

    /// Sets the capacity used when a configuration leaves it unset
    pub fn with_default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Makes every subsequent provision call fail
    pub fn fail_provision(&self, fail: bool) {
        self.fail_provision.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent shutdown call fail (the call is still counted)
    pub fn fail_shutdown(&self, fail: bool) {
        self.fail_shutdown.store(fail, Ordering::SeqCst);
    }

    pub fn is_running(&self, handle: &EngineHandle) -> bool {
        self.instances
            .get(&handle.id())
            .map(|instance| instance.running)
            .unwrap_or(false)
    }

    /// Number of shutdown calls received for `handle`
    pub fn shutdown_calls(&self, handle: &EngineHandle) -> usize {
        self.instances
            .get(&handle.id())
            .map(|instance| instance.shutdown_calls)
            .unwrap_or(0)
    }

    pub fn running_instances(&self) -> usize {
        self.instances.iter().filter(|i| i.running).count()
    }

    /// Handles of every instance ever provisioned, running or not
    pub fn handles(&self) -> Vec<EngineHandle> {
        self.instances.iter().map(|i| i.handle.clone()).collect()
    }
}

impl Engine for LocalEngine {
    fn provision(&self, scope: &str, _config: &CompleteConfiguration) -> Result<EngineHandle> {
        if self.fail_provision.load(Ordering::SeqCst) {
            bail!("local engine refused to provision instance '{}'", scope);
        }

        let handle = EngineHandle::new(scope);
        self.instances.insert(
            handle.id(),
            LocalInstance {
                handle: handle.clone(),
                caches: HashMap::new(),
                running: true,
                shutdown_calls: 0,
            },
        );

        info!("Provisioned local engine instance {}", handle);
        Ok(handle)
    }

    fn materialize_cache(
        &self,
        handle: &EngineHandle,
        name: &str,
        config: &CompleteConfiguration,
    ) -> Result<CacheHandle> {
        let Some(mut instance) = self.instances.get_mut(&handle.id()) else {
            bail!("unknown engine instance {}", handle);
        };
        if !instance.running {
            bail!("engine instance {} is stopped", handle);
        }
        if instance.caches.contains_key(name) {
            bail!("cache '{}' already exists in {}", name, handle);
        }

        let capacity = config.capacity.unwrap_or(self.default_capacity);
        let store: Arc<dyn CacheStore> = Arc::new(LruStore::new(capacity, config.expiry));
        let cache = CacheHandle::new(name, config.clone(), handle.clone(), store);
        instance.caches.insert(name.to_string(), cache.clone());

        debug!("Materialized cache '{}' (capacity {}) in {}", name, capacity, handle);
        Ok(cache)
    }

    fn cache(&self, handle: &EngineHandle, name: &str) -> Option<CacheHandle> {
        let instance = self.instances.get(&handle.id())?;
        if !instance.running {
            return None;
        }
        instance.caches.get(name).cloned()
    }

    fn shutdown(&self, handle: &EngineHandle) -> Result<()> {
        let Some(mut instance) = self.instances.get_mut(&handle.id()) else {
            bail!("unknown engine instance {}", handle);
        };
        instance.shutdown_calls += 1;

        if self.fail_shutdown.load(Ordering::SeqCst) {
            bail!("local engine failed to stop instance {}", handle);
        }

        if instance.running {
            instance.running = false;
            for cache in instance.caches.values() {
                cache.clear();
            }
            instance.caches.clear();
            let uptime = Utc::now() - instance.handle.started_at();
            info!(
                "Stopped local engine instance {} after {}ms",
                handle,
                uptime.num_milliseconds()
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
