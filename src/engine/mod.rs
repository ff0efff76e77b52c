//! Engine collaborator: provisions the instances that actually hold cache data.
//!
//! The registry owns one [`EngineHandle`] per cache name and delegates every
//! data operation through the [`CacheHandle`] the engine materializes.

pub mod handle;
pub mod local;

pub use handle::{CacheHandle, EngineHandle};
pub use local::LocalEngine;

use anyhow::Result;

use crate::configuration::CompleteConfiguration;

/// Scope under which the engine backing `cache_name` is provisioned
pub fn scope_for(cache_name: &str) -> String {
    format!("grid-for-{}", cache_name)
}

/// Trait for engines that back registry caches
///
/// Implementations own the lifecycle of provisioned instances; the registry
/// only keeps the handles and decides when to shut them down.
pub trait Engine: Send + Sync {
    /// Starts a new dedicated instance
    fn provision(&self, scope: &str, config: &CompleteConfiguration) -> Result<EngineHandle>;

    /// Creates cache `name` inside a provisioned instance
    fn materialize_cache(
        &self,
        handle: &EngineHandle,
        name: &str,
        config: &CompleteConfiguration,
    ) -> Result<CacheHandle>;

    /// Looks up a cache previously materialized in `handle`
    fn cache(&self, handle: &EngineHandle, name: &str) -> Option<CacheHandle>;

    /// Stops an instance and releases everything it holds
    fn shutdown(&self, handle: &EngineHandle) -> Result<()>;

    /// Returns the engine name for logging
    fn name(&self) -> &str;
}
