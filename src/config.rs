//! Provider-level configuration.

use serde::{Deserialize, Serialize};

/// Identity that supports cache creation unless configured otherwise
pub const DEFAULT_IDENTITY: &str = "cachemgr://default";

/// Configuration for the caching provider and the registries it hands out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// The manager identity allowed to create caches
    pub default_identity: String,

    /// Capacity applied to caches whose configuration leaves it unset
    pub default_capacity: usize,

    /// Domain used when composing monitoring registration names
    pub monitor_domain: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_identity: DEFAULT_IDENTITY.to_string(),
            default_capacity: 10_000,
            monitor_domain: "javax.cache".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Creates a configuration with the given default identity
    pub fn with_default_identity(identity: impl Into<String>) -> Self {
        Self {
            default_identity: identity.into(),
            ..Default::default()
        }
    }

    /// Sets the fallback cache capacity
    pub fn default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Sets the monitoring domain
    pub fn monitor_domain(mut self, domain: impl Into<String>) -> Self {
        self.monitor_domain = domain.into();
        self
    }

    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_identity = std::env::var("CACHE_MANAGER_DEFAULT_URI")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_identity);

        let default_capacity = std::env::var("CACHE_DEFAULT_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|c: &usize| *c > 0)
            .unwrap_or(defaults.default_capacity);

        let monitor_domain = std::env::var("CACHE_MONITOR_DOMAIN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.monitor_domain);

        Self {
            default_identity,
            default_capacity,
            monitor_domain,
        }
    }
}
