use bulkhead_api::{EmptyStore, ModuleStore};
use std::sync::Arc;

/// Stores owned by the hosting process rather than by any registered module.
#[derive(Clone)]
pub struct HostStores {
    /// Base symbols that must always resolve to the runtime's own copy.
    pub runtime: Arc<dyn ModuleStore>,
    /// The isolation framework's own SPI, logging and error types.
    pub framework: Arc<dyn ModuleStore>,
    /// Symbols injected by instrumentation agents.
    pub agent: Arc<dyn ModuleStore>,
    /// Last-resort system loader.
    pub system: Arc<dyn ModuleStore>,
}

impl Default for HostStores {
    fn default() -> Self {
        let empty: Arc<dyn ModuleStore> = Arc::new(EmptyStore);
        Self {
            runtime: empty.clone(),
            framework: empty.clone(),
            agent: empty.clone(),
            system: empty,
        }
    }
}
