//! Manager identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, immutable URI-like value naming a cache manager
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagerIdentity(String);

impl ManagerIdentity {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManagerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManagerIdentity {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for ManagerIdentity {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}
