//! Cache manager registry.
//!
//! A [`CacheRegistry`] binds each cache name to exactly one dedicated engine
//! instance and to the monitor descriptor exposed for that cache. It keeps
//! bookkeeping only: data lives in the engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use cachemgr::{CachingProvider, CompleteConfiguration};
//!
//! let provider = CachingProvider::local(Default::default());
//! let manager = provider.default_cache_manager();
//!
//! let config = CompleteConfiguration::typed::<i32, String>().into();
//! let orders = manager.create_cache("orders", &config)?;
//! orders.put("1", serde_json::json!("first"));
//!
//! manager.close();
//! ```

mod context;
mod entry;

pub use context::RegistryContext;

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::configuration::{CacheConfiguration, CompleteConfiguration, ValueType};
use crate::engine::{scope_for, CacheHandle, Engine, EngineHandle};
use crate::error::{RegistryError, RegistryResult};
use crate::identity::ManagerIdentity;
use crate::monitor::{CacheMonitor, MonitorError, MonitorName, MonitorRegistry};
use entry::{RegistryEntry, ShutdownClaim};

/// Registry of named caches for one manager identity
pub struct CacheRegistry {
    identity: ManagerIdentity,

    properties: HashMap<String, String>,

    context: RegistryContext,

    /// Cache name -> dedicated engine instance and monitor
    entries: DashMap<String, RegistryEntry>,

    /// Flips false -> true once, on the first `close`
    closed: AtomicBool,
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("identity", &self.identity)
            .field("properties", &self.properties)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl CacheRegistry {
    /// Creates an open registry for `identity`
    pub fn new(
        identity: impl Into<ManagerIdentity>,
        properties: HashMap<String, String>,
        context: RegistryContext,
    ) -> Self {
        let identity = identity.into();
        info!(
            "CacheRegistry initialized for {} (engine: {}, default identity: {})",
            identity,
            context.engine.name(),
            context.default_identity
        );
        Self {
            identity,
            properties,
            context,
            entries: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &ManagerIdentity {
        &self.identity
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn default_identity(&self) -> &ManagerIdentity {
        &self.context.default_identity
    }

    /// Creates cache `name`, backed by a newly provisioned engine instance
    ///
    /// The caller's configuration is never modified; when it carries no name
    /// a private copy is stamped with `name`.
    pub fn create_cache(
        &self,
        name: &str,
        config: &CacheConfiguration,
    ) -> RegistryResult<CacheHandle> {
        self.ensure_open()?;
        Self::require_name(name)?;

        let Some(complete) = config.as_complete() else {
            return Err(RegistryError::UnsupportedOperation(format!(
                "configuration is not complete: {:?}",
                config
            )));
        };

        let config: Cow<'_, CompleteConfiguration> = match complete.name.as_deref() {
            Some(declared) if declared != name => {
                return Err(RegistryError::ConflictingArgument(format!(
                    "configuration declares cache '{}' but '{}' was requested [manager={}]",
                    declared, name, self.identity
                )));
            }
            Some(_) => Cow::Borrowed(complete),
            None => Cow::Owned(complete.clone().name(name)),
        };

        if self.entries.contains_key(name) {
            return Err(self.already_exists(name));
        }

        if self.identity != self.context.default_identity {
            return Err(RegistryError::UnsupportedOperation(format!(
                "cache creation is only supported by {} [manager={}]",
                self.context.default_identity, self.identity
            )));
        }

        let cache = self.provision(name, &config)?;
        let engine = cache.engine().clone();

        let stop = match self.entries.entry(name.to_string()) {
            MapEntry::Occupied(_) => None,
            MapEntry::Vacant(slot) => {
                let entry = RegistryEntry::new(engine.clone(), CacheMonitor::new(cache.clone()));
                let stop = entry.stop.clone();
                slot.insert(entry);
                Some(stop)
            }
        };

        let Some(stop) = stop else {
            // Lost a concurrent create for the same name
            self.shutdown_engine(name, &engine);
            return Err(self.already_exists(name));
        };

        // A close that ran during provisioning may have missed this entry
        if self.is_closed() {
            self.entries.remove_if(name, |_, entry| entry.engine == engine);
            self.stop_engine(name, &engine, &stop);
            return Err(RegistryError::IllegalState {
                identity: self.identity.to_string(),
            });
        }

        info!("Created cache '{}' on {} [manager={}]", name, engine, self.identity);

        if config.management_enabled {
            self.enable_management(name, true)?;
        }

        Ok(cache)
    }

    /// Looks up a cache whose declared key and value types are both `any`
    ///
    /// Returns `Ok(None)` when no cache is registered under `name`.
    pub fn get_cache(&self, name: &str) -> RegistryResult<Option<CacheHandle>> {
        self.ensure_open()?;

        let Some(cache) = self.find_cache(name) else {
            return Ok(None);
        };

        if !cache.key_type().is_any() || !cache.value_type().is_any() {
            return Err(RegistryError::InvalidArgument(format!(
                "cache '{}' declares types <{}, {}>; request it with explicit types [manager={}]",
                name,
                cache.key_type(),
                cache.value_type(),
                self.identity
            )));
        }
        Ok(Some(cache))
    }

    /// Looks up a cache and checks that its declared types fit the requested ones
    pub fn get_cache_typed(
        &self,
        name: &str,
        key_type: &ValueType,
        value_type: &ValueType,
    ) -> RegistryResult<Option<CacheHandle>> {
        self.ensure_open()?;

        let Some(cache) = self.find_cache(name) else {
            return Ok(None);
        };

        for (requested, declared) in [(key_type, cache.key_type()), (value_type, cache.value_type())] {
            if !requested.is_assignable_from(declared) {
                return Err(RegistryError::TypeMismatch {
                    cache: name.to_string(),
                    requested: requested.to_string(),
                    declared: declared.to_string(),
                });
            }
        }
        Ok(Some(cache))
    }

    /// Typed lookup using Rust types for the key and value
    pub fn get_cache_as<K: ?Sized + 'static, V: ?Sized + 'static>(
        &self,
        name: &str,
    ) -> RegistryResult<Option<CacheHandle>> {
        self.get_cache_typed(name, &ValueType::of::<K>(), &ValueType::of::<V>())
    }

    /// Snapshot of the current cache names, empty once closed
    pub fn cache_names(&self) -> Vec<String> {
        if self.is_closed() {
            return Vec::new();
        }
        let names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        debug!("Listed {} caches [manager={}]", names.len(), self.identity);
        names
    }

    /// Removes cache `name` and stops its engine instance; unknown names are ignored
    pub fn destroy_cache(&self, name: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        Self::require_name(name)?;

        let Some((_, entry)) = self.entries.remove(name) else {
            debug!("destroy_cache: no cache '{}' [manager={}]", name, self.identity);
            return Ok(());
        };

        self.stop_engine(name, &entry.engine, &entry.stop);

        let monitor_name = self.monitor_name(name)?;
        self.unregister_monitors(name, &monitor_name)?;

        info!("Destroyed cache '{}' [manager={}]", name, self.identity);
        Ok(())
    }

    /// Registers or unregisters the monitor of cache `name`
    pub fn enable_management(&self, name: &str, enabled: bool) -> RegistryResult<()> {
        self.ensure_open()?;
        Self::require_name(name)?;

        let monitor_name = self.monitor_name(name)?;

        if !enabled {
            return self.unregister_monitors(name, &monitor_name);
        }

        let Some(monitor) = self.entries.get(name).map(|e| e.monitor.clone()) else {
            debug!("enable_management: no cache '{}' [manager={}]", name, self.identity);
            return Ok(());
        };

        let monitors = &self.context.monitors;
        if !monitors.query_names(&monitor_name).is_empty() {
            return Ok(());
        }
        match monitors.register(monitor_name, monitor) {
            Ok(()) => {
                debug!("Management enabled for cache '{}' [manager={}]", name, self.identity);
                Ok(())
            }
            // Registered concurrently by another caller
            Err(MonitorError::AlreadyRegistered(_)) => Ok(()),
            Err(err) => Err(self.monitoring_error(name, err)),
        }
    }

    /// Statistics toggling is not supported by this registry
    pub fn enable_statistics(&self, name: &str, enabled: bool) -> RegistryResult<()> {
        self.ensure_open()?;
        Self::require_name(name)?;

        Err(RegistryError::UnsupportedOperation(format!(
            "statistics cannot be {} for cache '{}' [manager={}]",
            if enabled { "enabled" } else { "disabled" },
            name,
            self.identity
        )))
    }

    /// Stops every engine instance; only the first call does any work
    ///
    /// Entries stay in place and monitor registrations are left alone.
    /// Shutdown failures are logged and discarded.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let engines: Vec<(String, EngineHandle, ShutdownClaim)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.engine.clone(), e.stop.clone()))
            .collect();

        for (name, engine, stop) in &engines {
            self.stop_engine(name, engine, stop);
        }

        info!("Closed cache manager {} ({} caches)", self.identity, engines.len());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Checks whether `candidate` is an engine instance provisioned by this registry
    pub fn is_managed_engine_instance(&self, candidate: &EngineHandle) -> RegistryResult<bool> {
        self.ensure_open()?;
        Ok(self.entries.iter().any(|e| e.engine == *candidate))
    }

    /// Views the registry as `T`; only the registry's own type is supported
    pub fn unwrap<T: Any>(&self) -> RegistryResult<&T> {
        self.ensure_open()?;
        (self as &dyn Any).downcast_ref::<T>().ok_or_else(|| {
            RegistryError::InvalidArgument(format!(
                "cache manager {} cannot be unwrapped to {}",
                self.identity,
                std::any::type_name::<T>()
            ))
        })
    }

    fn ensure_open(&self) -> RegistryResult<()> {
        if self.is_closed() {
            return Err(RegistryError::IllegalState {
                identity: self.identity.to_string(),
            });
        }
        Ok(())
    }

    fn require_name(name: &str) -> RegistryResult<()> {
        if name.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "cache name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn find_cache(&self, name: &str) -> Option<CacheHandle> {
        let engine = self.entries.get(name).map(|e| e.engine.clone())?;
        debug!("Cache lookup for '{}' on {}", name, engine);
        self.context.engine.cache(&engine, name)
    }

    /// Provisions a dedicated instance and materializes the cache in it
    fn provision(&self, name: &str, config: &CompleteConfiguration) -> RegistryResult<CacheHandle> {
        let engine = self
            .context
            .engine
            .provision(&scope_for(name), config)
            .map_err(|source| self.engine_error(name, source))?;

        match self.context.engine.materialize_cache(&engine, name, config) {
            Ok(cache) => Ok(cache),
            Err(source) => {
                self.shutdown_engine(name, &engine);
                Err(self.engine_error(name, source))
            }
        }
    }

    /// Shuts down a registered engine unless another path already did
    fn stop_engine(&self, name: &str, engine: &EngineHandle, stop: &ShutdownClaim) {
        if stop.claim() {
            self.shutdown_engine(name, engine);
        } else {
            debug!("Engine {} for cache '{}' already stopped [manager={}]", engine, name, self.identity);
        }
    }

    fn shutdown_engine(&self, name: &str, engine: &EngineHandle) {
        // Best-effort: a failed stop is logged, never returned
        if let Err(err) = self.context.engine.shutdown(engine) {
            warn!(
                "Ignoring shutdown failure of {} for cache '{}' [manager={}]: {:#}",
                engine, name, self.identity, err
            );
        }
    }

    fn monitor_name(&self, name: &str) -> RegistryResult<MonitorName> {
        MonitorName::for_cache(&self.context.monitor_domain, self.identity.as_str(), name)
            .map_err(|err| self.monitoring_error(name, err))
    }

    fn unregister_monitors(&self, name: &str, pattern: &MonitorName) -> RegistryResult<()> {
        let monitors = &self.context.monitors;
        for registered in monitors.query_names(pattern) {
            match monitors.unregister(&registered) {
                Ok(()) => debug!("Unregistered monitor {} [manager={}]", registered, self.identity),
                // Removed concurrently by another caller
                Err(MonitorError::NotFound(_)) => {
                    debug!("Monitor {} already gone [manager={}]", registered, self.identity)
                }
                Err(err) => return Err(self.monitoring_error(name, err)),
            }
        }
        Ok(())
    }

    fn already_exists(&self, name: &str) -> RegistryError {
        RegistryError::AlreadyExists {
            cache: name.to_string(),
            identity: self.identity.to_string(),
        }
    }

    fn engine_error(&self, name: &str, source: anyhow::Error) -> RegistryError {
        RegistryError::Engine {
            cache: name.to_string(),
            identity: self.identity.to_string(),
            source,
        }
    }

    fn monitoring_error(&self, name: &str, source: MonitorError) -> RegistryError {
        RegistryError::Monitoring {
            cache: name.to_string(),
            identity: self.identity.to_string(),
            source,
        }
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::BasicConfiguration;
    use crate::engine::LocalEngine;
    use crate::monitor::InMemoryMonitorRegistry;
    use serde_json::json;
    use std::sync::{Arc, OnceLock, Weak};
    use std::thread;

    const DEFAULT: &str = "cachemgr://default";

    struct Fixture {
        engine: Arc<LocalEngine>,
        monitors: Arc<InMemoryMonitorRegistry>,
        registry: CacheRegistry,
    }

    fn fixture_for(identity: &str) -> Fixture {
        let engine = Arc::new(LocalEngine::new());
        let monitors = Arc::new(InMemoryMonitorRegistry::new());
        let context = RegistryContext::new(DEFAULT, engine.clone(), monitors.clone());
        Fixture {
            registry: CacheRegistry::new(identity, HashMap::new(), context),
            engine,
            monitors,
        }
    }

    fn fixture() -> Fixture {
        fixture_for(DEFAULT)
    }

    fn untyped() -> CacheConfiguration {
        CompleteConfiguration::new().into()
    }

    fn typed() -> CacheConfiguration {
        CompleteConfiguration::typed::<i32, String>().into()
    }

    fn monitor_name(name: &str) -> MonitorName {
        MonitorName::for_cache("javax.cache", DEFAULT, name).unwrap()
    }

    #[test]
    fn test_create_then_get() {
        let f = fixture();
        let created = f.registry.create_cache("orders", &typed()).unwrap();
        created.put("1", json!("one"));

        let found = f
            .registry
            .get_cache_typed("orders", &ValueType::of::<i32>(), &ValueType::of::<String>())
            .unwrap()
            .unwrap();
        assert!(found.same_cache(&created));
        assert_eq!(found.get("1"), Some(json!("one")));
        assert_eq!(found.configuration().name.as_deref(), Some("orders"));
    }

    #[test]
    fn test_typed_lookup_mismatch() {
        let f = fixture();
        f.registry.create_cache("orders", &typed()).unwrap();

        assert!(f.registry.get_cache_as::<i32, String>("orders").unwrap().is_some());
        assert!(matches!(
            f.registry.get_cache_as::<i32, i32>("orders"),
            Err(RegistryError::TypeMismatch { .. })
        ));
        assert!(f
            .registry
            .get_cache_typed("orders", &ValueType::any(), &ValueType::any())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_untyped_lookup() {
        let f = fixture();
        f.registry.create_cache("plain", &untyped()).unwrap();
        f.registry.create_cache("typed", &typed()).unwrap();

        assert!(f.registry.get_cache("plain").unwrap().is_some());
        assert!(matches!(
            f.registry.get_cache("typed"),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(f.registry.get_cache("missing").unwrap().is_none());
        assert!(f.registry.get_cache_as::<i32, String>("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_create_keeps_first() {
        let f = fixture();
        let first = f.registry.create_cache("a", &untyped()).unwrap();

        let err = f.registry.create_cache("a", &typed()).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
        assert!(err.to_string().contains(DEFAULT));

        let found = f.registry.get_cache("a").unwrap().unwrap();
        assert!(found.same_cache(&first));
        assert_eq!(f.engine.running_instances(), 1);
    }

    #[test]
    fn test_incomplete_configuration_rejected() {
        let f = fixture();
        let basic: CacheConfiguration = BasicConfiguration::default().into();
        assert!(matches!(
            f.registry.create_cache("a", &basic),
            Err(RegistryError::UnsupportedOperation(_))
        ));
        assert!(f.registry.cache_names().is_empty());
    }

    #[test]
    fn test_configuration_name_rules() {
        let f = fixture();

        let conflicting: CacheConfiguration = CompleteConfiguration::new().name("b").into();
        assert!(matches!(
            f.registry.create_cache("a", &conflicting),
            Err(RegistryError::ConflictingArgument(_))
        ));

        let matching: CacheConfiguration = CompleteConfiguration::new().name("a").into();
        assert!(f.registry.create_cache("a", &matching).is_ok());

        let unnamed = untyped();
        let cache = f.registry.create_cache("c", &unnamed).unwrap();
        assert_eq!(cache.configuration().name.as_deref(), Some("c"));
        assert!(unnamed.as_complete().unwrap().name.is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let f = fixture();
        assert!(matches!(
            f.registry.create_cache("", &untyped()),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(f.registry.destroy_cache("").is_err());
        assert!(f.registry.enable_management("", true).is_err());
    }

    #[test]
    fn test_non_default_identity_cannot_create() {
        let f = fixture_for("cachemgr://elsewhere");
        assert!(matches!(
            f.registry.create_cache("a", &untyped()),
            Err(RegistryError::UnsupportedOperation(_))
        ));
        assert_eq!(f.engine.running_instances(), 0);
    }

    #[test]
    fn test_dedicated_engine_per_cache() {
        let f = fixture();
        let a = f.registry.create_cache("a", &untyped()).unwrap();
        let b = f.registry.create_cache("b", &untyped()).unwrap();

        assert_ne!(a.engine(), b.engine());
        assert_eq!(a.engine().scope(), "grid-for-a");
        assert!(f.registry.is_managed_engine_instance(a.engine()).unwrap());
        assert!(!f
            .registry
            .is_managed_engine_instance(&EngineHandle::new("grid-for-a"))
            .unwrap());
    }

    #[test]
    fn test_provision_failure_is_wrapped() {
        let f = fixture();
        f.engine.fail_provision(true);

        let err = f.registry.create_cache("a", &untyped()).unwrap_err();
        assert!(matches!(err, RegistryError::Engine { .. }));
        assert!(err.to_string().contains("'a'"));
        assert!(f.registry.cache_names().is_empty());
    }

    #[test]
    fn test_destroy_unknown_is_noop() {
        let f = fixture();
        f.registry.create_cache("a", &untyped()).unwrap();
        f.registry.destroy_cache("never").unwrap();
        assert_eq!(f.registry.cache_names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_destroy_stops_engine_and_allows_reuse() {
        let f = fixture();
        let first = f.registry.create_cache("a", &untyped()).unwrap();
        f.registry.destroy_cache("a").unwrap();

        assert!(!f.engine.is_running(first.engine()));
        assert!(f.registry.get_cache("a").unwrap().is_none());

        let second = f.registry.create_cache("a", &typed()).unwrap();
        assert_ne!(second.engine(), first.engine());
        assert!(f.registry.get_cache_as::<i32, String>("a").unwrap().is_some());
    }

    #[test]
    fn test_destroy_swallows_shutdown_failure() {
        let f = fixture();
        let cache = f.registry.create_cache("a", &untyped()).unwrap();
        f.engine.fail_shutdown(true);

        f.registry.destroy_cache("a").unwrap();
        assert_eq!(f.engine.shutdown_calls(cache.engine()), 1);
        assert!(f.registry.cache_names().is_empty());
    }

    #[test]
    fn test_destroy_unregisters_monitor() {
        let f = fixture();
        let config: CacheConfiguration = CompleteConfiguration::new().management_enabled(true).into();
        f.registry.create_cache("a", &config).unwrap();
        assert!(f.monitors.is_registered(&monitor_name("a")));

        f.registry.destroy_cache("a").unwrap();
        assert!(!f.monitors.is_registered(&monitor_name("a")));
    }

    #[test]
    fn test_management_toggle() {
        let f = fixture();
        f.registry.create_cache("a", &untyped()).unwrap();
        assert!(f.monitors.is_empty());

        f.registry.enable_management("a", true).unwrap();
        f.registry.enable_management("a", true).unwrap();
        assert_eq!(f.monitors.len(), 1);
        let monitor = f.monitors.lookup(&monitor_name("a")).unwrap();
        assert_eq!(monitor.cache_name(), "a");

        f.registry.enable_management("a", false).unwrap();
        f.registry.enable_management("a", false).unwrap();
        assert!(f.monitors.is_empty());
    }

    #[test]
    fn test_management_on_unknown_cache() {
        let f = fixture();
        f.registry.enable_management("ghost", true).unwrap();
        f.registry.enable_management("ghost", false).unwrap();
        assert!(f.monitors.is_empty());
    }

    #[test]
    fn test_management_surfaces_failures() {
        let f = fixture();
        f.registry.create_cache("a", &untyped()).unwrap();

        f.monitors.fail_registrations(true);
        assert!(matches!(
            f.registry.enable_management("a", true),
            Err(RegistryError::Monitoring {
                source: MonitorError::Registration { .. },
                ..
            })
        ));

        assert!(matches!(
            f.registry.enable_management("bad*name", true),
            Err(RegistryError::Monitoring {
                source: MonitorError::MalformedName { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_name_surfaces_on_destroy() {
        let f = fixture();
        f.registry.create_cache("bad?name", &untyped()).unwrap();
        assert!(matches!(
            f.registry.destroy_cache("bad?name"),
            Err(RegistryError::Monitoring { .. })
        ));
        // The entry is gone even though the unregister step failed
        assert!(f.registry.cache_names().is_empty());
    }

    #[test]
    fn test_statistics_toggle_unsupported() {
        let f = fixture();
        f.registry.create_cache("a", &untyped()).unwrap();
        for name in ["a", "missing"] {
            for enabled in [true, false] {
                assert!(matches!(
                    f.registry.enable_statistics(name, enabled),
                    Err(RegistryError::UnsupportedOperation(_))
                ));
            }
        }
    }

    #[test]
    fn test_cache_names_snapshot() {
        let f = fixture();
        f.registry.create_cache("a", &untyped()).unwrap();
        let names = f.registry.cache_names();

        f.registry.create_cache("b", &untyped()).unwrap();
        f.registry.destroy_cache("a").unwrap();

        assert_eq!(names, vec!["a".to_string()]);
        assert_eq!(f.registry.cache_names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_close_once() {
        let f = fixture();
        let a = f.registry.create_cache("a", &untyped()).unwrap();
        let b = f.registry.create_cache("b", &untyped()).unwrap();

        f.registry.close();
        f.registry.close();

        assert!(f.registry.is_closed());
        assert_eq!(f.engine.shutdown_calls(a.engine()), 1);
        assert_eq!(f.engine.shutdown_calls(b.engine()), 1);
        assert!(f.registry.cache_names().is_empty());
    }

    #[test]
    fn test_close_swallows_shutdown_failures() {
        let f = fixture();
        let a = f.registry.create_cache("a", &untyped()).unwrap();
        f.engine.fail_shutdown(true);

        f.registry.close();
        assert!(f.registry.is_closed());
        assert_eq!(f.engine.shutdown_calls(a.engine()), 1);
    }

    #[test]
    fn test_operations_fail_after_close() {
        let f = fixture();
        let a = f.registry.create_cache("a", &untyped()).unwrap();
        f.registry.close();

        let results = [
            f.registry.create_cache("b", &untyped()).map(|_| ()),
            f.registry.get_cache("a").map(|_| ()),
            f.registry.get_cache_as::<i32, String>("a").map(|_| ()),
            f.registry.destroy_cache("a"),
            f.registry.enable_management("a", true),
            f.registry.enable_statistics("a", true),
            f.registry.is_managed_engine_instance(a.engine()).map(|_| ()),
            f.registry.unwrap::<CacheRegistry>().map(|_| ()),
        ];
        for result in results {
            assert!(result.unwrap_err().is_illegal_state());
        }
    }

    #[test]
    fn test_concurrent_close_tears_down_once() {
        let f = fixture();
        let handles: Vec<CacheHandle> = (0..4)
            .map(|i| f.registry.create_cache(&format!("c{}", i), &untyped()).unwrap())
            .collect();

        let registry = Arc::new(f.registry);
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.close())
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        for handle in &handles {
            assert_eq!(f.engine.shutdown_calls(handle.engine()), 1);
        }
    }

    #[test]
    fn test_concurrent_create_same_name() {
        let f = fixture();
        let registry = Arc::new(f.registry);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.create_cache("shared", &untyped()).is_ok())
            })
            .collect();
        let successes = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(registry.cache_names(), vec!["shared".to_string()]);
        assert_eq!(f.engine.running_instances(), 1);
    }

    #[test]
    fn test_unwrap() {
        let f = fixture();
        let this = f.registry.unwrap::<CacheRegistry>().unwrap();
        assert_eq!(this.identity(), f.registry.identity());

        assert!(matches!(
            f.registry.unwrap::<LocalEngine>(),
            Err(RegistryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_drop_closes() {
        let f = fixture();
        let a = f.registry.create_cache("a", &untyped()).unwrap();
        let engine = f.engine.clone();

        drop(f.registry);
        assert!(!engine.is_running(a.engine()));
        assert_eq!(engine.shutdown_calls(a.engine()), 1);
        assert_eq!(engine.name(), "local");
    }

    /// Engine that closes its registry while provisioning
    struct ClosingEngine {
        inner: LocalEngine,
        registry: OnceLock<Weak<CacheRegistry>>,
    }

    impl Engine for ClosingEngine {
        fn provision(
            &self,
            scope: &str,
            config: &CompleteConfiguration,
        ) -> anyhow::Result<EngineHandle> {
            if let Some(registry) = self.registry.get().and_then(Weak::upgrade) {
                registry.close();
            }
            self.inner.provision(scope, config)
        }

        fn materialize_cache(
            &self,
            handle: &EngineHandle,
            name: &str,
            config: &CompleteConfiguration,
        ) -> anyhow::Result<CacheHandle> {
            self.inner.materialize_cache(handle, name, config)
        }

        fn cache(&self, handle: &EngineHandle, name: &str) -> Option<CacheHandle> {
            self.inner.cache(handle, name)
        }

        fn shutdown(&self, handle: &EngineHandle) -> anyhow::Result<()> {
            self.inner.shutdown(handle)
        }

        fn name(&self) -> &str {
            "closing"
        }
    }

    #[test]
    fn test_create_racing_close_stops_engine() {
        let engine = Arc::new(ClosingEngine {
            inner: LocalEngine::new(),
            registry: OnceLock::new(),
        });
        let context = RegistryContext::new(
            DEFAULT,
            engine.clone(),
            Arc::new(InMemoryMonitorRegistry::new()),
        );
        let registry = Arc::new(CacheRegistry::new(DEFAULT, HashMap::new(), context));
        assert!(engine.registry.set(Arc::downgrade(&registry)).is_ok());

        let err = registry.create_cache("late", &untyped()).unwrap_err();
        assert!(err.is_illegal_state());
        assert!(registry.is_closed());

        let handles = engine.inner.handles();
        assert_eq!(handles.len(), 1);
        assert_eq!(engine.inner.running_instances(), 0);
        assert_eq!(engine.inner.shutdown_calls(&handles[0]), 1);
    }

    #[test]
    fn test_destroy_racing_close_stops_engine_once() {
        for round in 0..20 {
            let f = fixture();
            let handles: Vec<CacheHandle> = (0..4)
                .map(|i| f.registry.create_cache(&format!("c{}", i), &untyped()).unwrap())
                .collect();

            let registry = Arc::new(f.registry);
            let mut threads = Vec::new();
            for i in 0..4 {
                let registry = Arc::clone(&registry);
                threads.push(thread::spawn(move || {
                    // Fails with IllegalState once close has won
                    let _ = registry.destroy_cache(&format!("c{}", i));
                }));
            }
            let closer = Arc::clone(&registry);
            threads.push(thread::spawn(move || closer.close()));
            for t in threads {
                t.join().unwrap();
            }

            for handle in &handles {
                assert_eq!(
                    f.engine.shutdown_calls(handle.engine()),
                    1,
                    "round {} cache {}",
                    round,
                    handle.name()
                );
            }
        }
    }
}
