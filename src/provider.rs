//! Caching provider: hands out one registry per manager identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::engine::{Engine, LocalEngine};
use crate::identity::ManagerIdentity;
use crate::monitor::{InMemoryMonitorRegistry, MonitorRegistry};
use crate::registry::{CacheRegistry, RegistryContext};

/// Owner of the engine, the monitoring registry and every cache manager
pub struct CachingProvider {
    config: ProviderConfig,

    context: RegistryContext,

    managers: Mutex<HashMap<ManagerIdentity, Arc<CacheRegistry>>>,
}

impl CachingProvider {
    pub fn new(
        config: ProviderConfig,
        engine: Arc<dyn Engine>,
        monitors: Arc<dyn MonitorRegistry>,
    ) -> Self {
        let context = RegistryContext::from_config(&config, engine, monitors);
        info!(
            "CachingProvider initialized with engine: {}, default identity: {}",
            context.engine().name(),
            config.default_identity
        );
        Self {
            config,
            context,
            managers: Mutex::new(HashMap::new()),
        }
    }

    /// Provider backed by an in-process engine and monitor registry
    pub fn local(config: ProviderConfig) -> Self {
        let engine = LocalEngine::new().with_default_capacity(config.default_capacity);
        Self::new(config, Arc::new(engine), Arc::new(InMemoryMonitorRegistry::new()))
    }

    /// Local provider configured from environment variables
    pub fn from_env() -> Self {
        Self::local(ProviderConfig::from_env())
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn default_identity(&self) -> &ManagerIdentity {
        self.context.default_identity()
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        self.context.engine()
    }

    pub fn monitors(&self) -> &Arc<dyn MonitorRegistry> {
        self.context.monitors()
    }

    fn managers(&self) -> MutexGuard<'_, HashMap<ManagerIdentity, Arc<CacheRegistry>>> {
        self.managers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the open registry for `identity`, creating it when needed
    ///
    /// `properties` are only used when a new registry is created.
    pub fn get_cache_manager(
        &self,
        identity: impl Into<ManagerIdentity>,
        properties: HashMap<String, String>,
    ) -> Arc<CacheRegistry> {
        let identity = identity.into();
        let mut managers = self.managers();

        if let Some(existing) = managers.get(&identity) {
            if !existing.is_closed() {
                debug!("Reusing cache manager {}", identity);
                return Arc::clone(existing);
            }
        }

        let manager = Arc::new(CacheRegistry::new(
            identity.clone(),
            properties,
            self.context.clone(),
        ));
        managers.insert(identity, Arc::clone(&manager));
        manager
    }

    pub fn default_cache_manager(&self) -> Arc<CacheRegistry> {
        self.get_cache_manager(self.default_identity().clone(), HashMap::new())
    }

    /// Closes and forgets the registry for `identity`, if any
    pub fn close_cache_manager(&self, identity: &ManagerIdentity) {
        let removed = self.managers().remove(identity);
        if let Some(manager) = removed {
            manager.close();
        }
    }

    /// Closes every registry handed out so far
    pub fn close(&self) {
        let managers: Vec<Arc<CacheRegistry>> =
            self.managers().drain().map(|(_, manager)| manager).collect();

        for manager in &managers {
            manager.close();
        }
        info!("CachingProvider closed {} cache managers", managers.len());
    }
}
