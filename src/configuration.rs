//! Cache configurations accepted by the registry.
//!
//! Two shapes exist: a [`BasicConfiguration`] that only declares key/value
//! types, and a [`CompleteConfiguration`] that carries every option a cache
//! needs to be materialized on its own. Only the latter can create a cache.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const ANY_TYPE: &str = "any";

/// Declared key or value type of a cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueType(String);

impl ValueType {
    /// The unconstrained type: every declared type is assignable to it
    pub fn any() -> Self {
        Self(ANY_TYPE.to_string())
    }

    /// Names a concrete Rust type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn is_any(&self) -> bool {
        self.0 == ANY_TYPE
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Checks whether a cache declared with `declared` can be viewed as `self`
    pub fn is_assignable_from(&self, declared: &ValueType) -> bool {
        self.is_any() || self == declared
    }
}

impl Default for ValueType {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal configuration: declared types only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicConfiguration {
    pub key_type: ValueType,
    pub value_type: ValueType,
    pub store_by_value: bool,
}

impl Default for BasicConfiguration {
    fn default() -> Self {
        Self {
            key_type: ValueType::any(),
            value_type: ValueType::any(),
            store_by_value: true,
        }
    }
}

impl BasicConfiguration {
    pub fn typed<K: ?Sized + 'static, V: ?Sized + 'static>() -> Self {
        Self {
            key_type: ValueType::of::<K>(),
            value_type: ValueType::of::<V>(),
            ..Default::default()
        }
    }
}

/// Self-sufficient cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteConfiguration {
    /// Cache name; stamped by the registry when absent
    pub name: Option<String>,

    pub key_type: ValueType,

    pub value_type: ValueType,

    pub store_by_value: bool,

    pub read_through: bool,

    pub write_through: bool,

    pub statistics_enabled: bool,

    /// Register the cache with the monitoring registry on creation
    pub management_enabled: bool,

    /// Time-to-live for entries (None = no expiration)
    pub expiry: Option<Duration>,

    /// Maximum number of entries (None = provider default)
    pub capacity: Option<usize>,
}

impl Default for CompleteConfiguration {
    fn default() -> Self {
        Self {
            name: None,
            key_type: ValueType::any(),
            value_type: ValueType::any(),
            store_by_value: true,
            read_through: false,
            write_through: false,
            statistics_enabled: false,
            management_enabled: false,
            expiry: None,
            capacity: None,
        }
    }
}

impl CompleteConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration declaring `K` keys and `V` values
    pub fn typed<K: ?Sized + 'static, V: ?Sized + 'static>() -> Self {
        Self::default().types(ValueType::of::<K>(), ValueType::of::<V>())
    }

    /// Upgrades a basic configuration, keeping its declared types
    pub fn from_basic(basic: &BasicConfiguration) -> Self {
        Self {
            key_type: basic.key_type.clone(),
            value_type: basic.value_type.clone(),
            store_by_value: basic.store_by_value,
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn types(mut self, key_type: ValueType, value_type: ValueType) -> Self {
        self.key_type = key_type;
        self.value_type = value_type;
        self
    }

    pub fn store_by_value(mut self, enabled: bool) -> Self {
        self.store_by_value = enabled;
        self
    }

    pub fn read_through(mut self, enabled: bool) -> Self {
        self.read_through = enabled;
        self
    }

    pub fn write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    pub fn statistics_enabled(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    pub fn management_enabled(mut self, enabled: bool) -> Self {
        self.management_enabled = enabled;
        self
    }

    pub fn expiry(mut self, ttl: Duration) -> Self {
        self.expiry = Some(ttl);
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// Configuration passed to `create_cache`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheConfiguration {
    Basic(BasicConfiguration),
    Complete(CompleteConfiguration),
}

impl CacheConfiguration {
    pub fn key_type(&self) -> &ValueType {
        match self {
            CacheConfiguration::Basic(c) => &c.key_type,
            CacheConfiguration::Complete(c) => &c.key_type,
        }
    }

    pub fn value_type(&self) -> &ValueType {
        match self {
            CacheConfiguration::Basic(c) => &c.value_type,
            CacheConfiguration::Complete(c) => &c.value_type,
        }
    }

    /// Returns the complete form, if this configuration is self-sufficient
    pub fn as_complete(&self) -> Option<&CompleteConfiguration> {
        match self {
            CacheConfiguration::Complete(c) => Some(c),
            CacheConfiguration::Basic(_) => None,
        }
    }
}

impl From<BasicConfiguration> for CacheConfiguration {
    fn from(config: BasicConfiguration) -> Self {
        CacheConfiguration::Basic(config)
    }
}

impl From<CompleteConfiguration> for CacheConfiguration {
    fn from(config: CompleteConfiguration) -> Self {
        CacheConfiguration::Complete(config)
    }
}
