//! Collaborators shared by the registries of one provider.

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::engine::Engine;
use crate::identity::ManagerIdentity;
use crate::monitor::MonitorRegistry;

/// Engine, monitoring registry and provider settings a registry works with
#[derive(Clone)]
pub struct RegistryContext {
    /// Only registries with this identity may create caches
    pub(crate) default_identity: ManagerIdentity,

    pub(crate) engine: Arc<dyn Engine>,

    pub(crate) monitors: Arc<dyn MonitorRegistry>,

    /// Domain of monitor registration names
    pub(crate) monitor_domain: String,
}

impl RegistryContext {
    pub fn new(
        default_identity: impl Into<ManagerIdentity>,
        engine: Arc<dyn Engine>,
        monitors: Arc<dyn MonitorRegistry>,
    ) -> Self {
        Self {
            default_identity: default_identity.into(),
            engine,
            monitors,
            monitor_domain: ProviderConfig::default().monitor_domain,
        }
    }

    /// Builds a context from provider configuration
    pub fn from_config(
        config: &ProviderConfig,
        engine: Arc<dyn Engine>,
        monitors: Arc<dyn MonitorRegistry>,
    ) -> Self {
        Self::new(config.default_identity.as_str(), engine, monitors)
            .monitor_domain(config.monitor_domain.clone())
    }

    pub fn monitor_domain(mut self, domain: impl Into<String>) -> Self {
        self.monitor_domain = domain.into();
        self
    }

    pub fn default_identity(&self) -> &ManagerIdentity {
        &self.default_identity
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn monitors(&self) -> &Arc<dyn MonitorRegistry> {
        &self.monitors
    }
}
