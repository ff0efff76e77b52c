//! Registration names of the form `domain:key=value,key=value`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::MonitorError;

/// Characters that can never appear inside a key or value
const RESERVED: &[char] = &[',', ':', '=', '*', '?', '"', '\n'];

/// Characters replaced by `.` when an identity or cache name is embedded
const SANITIZED: &[char] = &[',', ':', '=', '\n'];

/// Name under which a monitor is registered
///
/// Properties are kept sorted, so two names listing the same properties in a
/// different order are equal. A name ending in `,*` is a pattern that also
/// matches names carrying additional properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorName {
    domain: String,
    properties: BTreeMap<String, String>,
    wildcard: bool,
}

impl MonitorName {
    /// Builds and validates a name from its parts
    pub fn new<I, K, V>(domain: &str, properties: I) -> Result<Self, MonitorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let properties: BTreeMap<String, String> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let name = Self {
            domain: domain.to_string(),
            properties,
            wildcard: false,
        };
        name.validate()?;
        Ok(name)
    }

    /// Registration name for `cache` managed by `identity`
    pub fn for_cache(domain: &str, identity: &str, cache: &str) -> Result<Self, MonitorError> {
        Self::new(
            domain,
            [
                ("type", "CacheConfiguration".to_string()),
                ("CacheManager", sanitize(identity)),
                ("Cache", sanitize(cache)),
            ],
        )
    }

    /// Turns this name into a pattern that tolerates extra properties
    pub fn into_pattern(mut self) -> Self {
        self.wildcard = true;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_pattern(&self) -> bool {
        self.wildcard
    }

    /// Checks whether `name` is selected by this name used as a pattern
    pub fn matches(&self, name: &MonitorName) -> bool {
        if self.domain != name.domain {
            return false;
        }
        if self.wildcard {
            self.properties
                .iter()
                .all(|(k, v)| name.properties.get(k) == Some(v))
        } else {
            self.properties == name.properties
        }
    }

    fn validate(&self) -> Result<(), MonitorError> {
        if self.domain.is_empty() {
            return Err(MonitorError::malformed(self.to_string(), "empty domain"));
        }
        if self.domain.contains([':', '\n']) {
            return Err(MonitorError::malformed(self.to_string(), "reserved character in domain"));
        }
        if self.properties.is_empty() && !self.wildcard {
            return Err(MonitorError::malformed(self.to_string(), "no properties"));
        }
        for (key, value) in &self.properties {
            if key.is_empty() || value.is_empty() {
                return Err(MonitorError::malformed(self.to_string(), "empty key or value"));
            }
            if key.contains(RESERVED) || value.contains(RESERVED) {
                return Err(MonitorError::malformed(
                    self.to_string(),
                    format!("reserved character in '{}={}'", key, value),
                ));
            }
        }
        Ok(())
    }
}

/// Replaces separator characters so arbitrary text can be embedded as a value
pub fn sanitize(raw: &str) -> String {
    raw.replace(SANITIZED, ".")
}

impl fmt::Display for MonitorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        let mut first = true;
        for (key, value) in &self.properties {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        if self.wildcard {
            f.write_str(if first { "*" } else { ",*" })?;
        }
        Ok(())
    }
}

impl FromStr for MonitorName {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((domain, rest)) = s.split_once(':') else {
            return Err(MonitorError::malformed(s, "missing domain separator"));
        };

        let mut properties = BTreeMap::new();
        let mut wildcard = false;
        for part in rest.split(',') {
            if part == "*" {
                wildcard = true;
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(MonitorError::malformed(s, format!("property '{}' lacks '='", part)));
            };
            if properties.insert(key.to_string(), value.to_string()).is_some() {
                return Err(MonitorError::malformed(s, format!("duplicate key '{}'", key)));
            }
        }

        let name = Self {
            domain: domain.to_string(),
            properties,
            wildcard,
        };
        name.validate()?;
        Ok(name)
    }
}
