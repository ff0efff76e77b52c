//! Monitoring registration for caches.
//!
//! Each cache can expose a [`CacheMonitor`] under a [`MonitorName`] composed
//! from the manager identity and the cache name. The registry that stores
//! these registrations is abstracted by [`MonitorRegistry`].

pub mod descriptor;
pub mod name;
pub mod registry;

pub use descriptor::{CacheMonitor, CacheMonitorSnapshot};
pub use name::MonitorName;
pub use registry::{InMemoryMonitorRegistry, MonitorRegistry};

use thiserror::Error;

/// Failures reported by a [`MonitorRegistry`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Malformed monitor name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    #[error("Monitor already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Monitor not registered: {0}")]
    NotFound(String),

    #[error("Monitor registration failed for '{name}': {reason}")]
    Registration { name: String, reason: String },
}

impl MonitorError {
    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        MonitorError::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
