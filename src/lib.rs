//! cachemgr: a cache manager registry.
//!
//! Tracks which caches exist under a manager identity, binds each cache name
//! to a dedicated engine instance, exposes monitoring registration and
//! guarantees idempotent shutdown. Cache contents live in the engine.

pub mod config;
pub mod configuration;
pub mod engine;
pub mod error;
pub mod identity;
pub mod monitor;
pub mod provider;
pub mod registry;
pub mod store;

// Re-export main types
pub use config::ProviderConfig;
pub use configuration::{BasicConfiguration, CacheConfiguration, CompleteConfiguration, ValueType};
pub use error::{RegistryError, RegistryResult};
pub use identity::ManagerIdentity;
pub use provider::CachingProvider;
pub use registry::{CacheRegistry, RegistryContext};

// Collaborator exports
pub use engine::{CacheHandle, Engine, EngineHandle, LocalEngine};
pub use monitor::{
    CacheMonitor, CacheMonitorSnapshot, InMemoryMonitorRegistry, MonitorError, MonitorName,
    MonitorRegistry,
};
pub use store::{CacheStore, LruStore, StoreStatistics};
