//! Bookkeeping record for one live cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::EngineHandle;
use crate::monitor::CacheMonitor;

/// Binds a cache name to its dedicated engine instance and monitor
pub(crate) struct RegistryEntry {
    /// Owned by the registry until the entry is removed
    pub(crate) engine: EngineHandle,

    pub(crate) monitor: Arc<CacheMonitor>,

    /// Shared by every path that may stop `engine`
    pub(crate) stop: ShutdownClaim,
}

impl RegistryEntry {
    pub(crate) fn new(engine: EngineHandle, monitor: CacheMonitor) -> Self {
        Self {
            engine,
            monitor: Arc::new(monitor),
            stop: ShutdownClaim::default(),
        }
    }
}

/// One-shot right to shut an engine instance down
///
/// Clones share the flag: `close`, `destroy_cache` and a `create_cache`
/// that raced a close may all hold one, and only the first `claim` wins.
#[derive(Clone, Default)]
pub(crate) struct ShutdownClaim(Arc<AtomicBool>);

impl ShutdownClaim {
    /// Returns true exactly once across all clones
    pub(crate) fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}
