//! Error types for the cache registry.

use thiserror::Error;

use crate::monitor::MonitorError;

/// Errors surfaced by [`CacheRegistry`](crate::registry::CacheRegistry) and
/// [`CachingProvider`](crate::provider::CachingProvider).
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch for cache '{cache}': requested {requested}, declared {declared}")]
    TypeMismatch {
        cache: String,
        requested: String,
        declared: String,
    },

    #[error("Conflicting argument: {0}")]
    ConflictingArgument(String),

    #[error("Cache already exists [cacheName={cache}, manager={identity}]")]
    AlreadyExists { cache: String, identity: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Cache manager is closed [identity={identity}]")]
    IllegalState { identity: String },

    #[error("Engine failure for cache '{cache}' [manager={identity}]: {source}")]
    Engine {
        cache: String,
        identity: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Monitoring registration failed for cache '{cache}' [manager={identity}]: {source}")]
    Monitoring {
        cache: String,
        identity: String,
        #[source]
        source: MonitorError,
    },
}

impl RegistryError {
    /// Returns a short, stable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::InvalidArgument(_) => "INVALID_ARGUMENT",
            RegistryError::TypeMismatch { .. } => "TYPE_MISMATCH",
            RegistryError::ConflictingArgument(_) => "CONFLICTING_ARGUMENT",
            RegistryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            RegistryError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            RegistryError::IllegalState { .. } => "ILLEGAL_STATE",
            RegistryError::Engine { .. } => "ENGINE_ERROR",
            RegistryError::Monitoring { .. } => "MONITORING_ERROR",
        }
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self, RegistryError::IllegalState { .. })
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
