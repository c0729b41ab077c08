use super::IsolationContainer;
use crate::config::IsolationConfig;
use crate::error::Result;
use crate::registry::Registry;
use crate::resolver::{HostStores, Resolver};
use crate::visibility::SymbolRules;
use bulkhead_api::ModuleStore;
use std::sync::Arc;

/// Assembles an [`IsolationContainer`] with its host-side stores.
pub struct ContainerBuilder {
    config: IsolationConfig,
    hosts: HostStores,
}

impl ContainerBuilder {
    pub fn new(config: IsolationConfig) -> Self {
        Self {
            config,
            hosts: HostStores::default(),
        }
    }

    pub fn with_runtime_store(mut self, store: Arc<dyn ModuleStore>) -> Self {
        self.hosts.runtime = store;
        self
    }

    pub fn with_framework_store(mut self, store: Arc<dyn ModuleStore>) -> Self {
        self.hosts.framework = store;
        self
    }

    pub fn with_agent_store(mut self, store: Arc<dyn ModuleStore>) -> Self {
        self.hosts.agent = store;
        self
    }

    pub fn with_system_store(mut self, store: Arc<dyn ModuleStore>) -> Self {
        self.hosts.system = store;
        self
    }

    /// Validate the configuration and wire the container. Fails on bad cache
    /// settings or malformed framework namespace patterns.
    pub fn build(self) -> Result<IsolationContainer> {
        self.config.validate()?;
        let framework = SymbolRules::namespaces(&self.config.framework_namespaces)?;
        let registry = Arc::new(Registry::new());
        let resolver = Resolver::new(
            registry.clone(),
            self.hosts,
            framework,
            self.config.deny_mode,
        );

        tracing::debug!(
            "Built isolation container (deny mode {:?}, {} framework namespaces)",
            self.config.deny_mode,
            self.config.framework_namespaces.len()
        );
        Ok(IsolationContainer::from_parts(self.config, registry, resolver))
    }
}
