//! Registry of monitor registrations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::descriptor::CacheMonitor;
use super::name::MonitorName;
use super::MonitorError;

/// Trait for registries that expose cache monitors to external tooling
pub trait MonitorRegistry: Send + Sync {
    /// Registers `monitor` under `name`; fails if the name is taken
    fn register(&self, name: MonitorName, monitor: Arc<CacheMonitor>) -> Result<(), MonitorError>;

    /// Removes the registration under `name`
    fn unregister(&self, name: &MonitorName) -> Result<(), MonitorError>;

    /// Returns every registered name matched by `pattern`
    fn query_names(&self, pattern: &MonitorName) -> Vec<MonitorName>;

    fn lookup(&self, name: &MonitorName) -> Option<Arc<CacheMonitor>>;

    fn is_registered(&self, name: &MonitorName) -> bool {
        self.lookup(name).is_some()
    }
}

/// Process-local monitor registry
#[derive(Default)]
pub struct InMemoryMonitorRegistry {
    monitors: RwLock<HashMap<MonitorName, Arc<CacheMonitor>>>,
    fail_registrations: AtomicBool,
}

impl InMemoryMonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `register` call fail with a registration error
    pub fn fail_registrations(&self, fail: bool) {
        self.fail_registrations.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<MonitorName, Arc<CacheMonitor>>> {
        self.monitors.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<MonitorName, Arc<CacheMonitor>>> {
        self.monitors.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MonitorRegistry for InMemoryMonitorRegistry {
    fn register(&self, name: MonitorName, monitor: Arc<CacheMonitor>) -> Result<(), MonitorError> {
        if name.is_pattern() {
            return Err(MonitorError::Registration {
                name: name.to_string(),
                reason: "cannot register under a pattern".to_string(),
            });
        }
        if self.fail_registrations.load(Ordering::SeqCst) {
            return Err(MonitorError::Registration {
                name: name.to_string(),
                reason: "registry rejected the monitor".to_string(),
            });
        }

        let mut monitors = self.write();
        if monitors.contains_key(&name) {
            return Err(MonitorError::AlreadyRegistered(name.to_string()));
        }
        debug!("Registered monitor {}", name);
        monitors.insert(name, monitor);
        Ok(())
    }

    fn unregister(&self, name: &MonitorName) -> Result<(), MonitorError> {
        match self.write().remove(name) {
            Some(_) => {
                debug!("Unregistered monitor {}", name);
                Ok(())
            }
            None => Err(MonitorError::NotFound(name.to_string())),
        }
    }

    fn query_names(&self, pattern: &MonitorName) -> Vec<MonitorName> {
        self.read()
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect()
    }

    fn lookup(&self, name: &MonitorName) -> Option<Arc<CacheMonitor>> {
        self.read().get(name).cloned()
    }
}
