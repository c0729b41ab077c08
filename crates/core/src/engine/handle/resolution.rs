use super::IsolationHandle;
use bulkhead_api::{ConsumerId, ProviderId, ResolutionService, ResolveResult, Resolved};

impl ResolutionService for IsolationHandle {
    fn resolve_symbol(&self, name: &str, consumer: &ConsumerId) -> ResolveResult<Resolved> {
        self.container.resolve_symbol(name, consumer)
    }

    fn resolve_resource(&self, path: &str, consumer: &ConsumerId) -> ResolveResult<Vec<Resolved>> {
        self.container.resolve_resource(path, consumer)
    }

    fn find_resource(&self, path: &str, consumer: &ConsumerId) -> ResolveResult<Option<Resolved>> {
        self.container.find_resource(path, consumer)
    }

    fn resolve_symbol_for_provider(
        &self,
        name: &str,
        provider: &ProviderId,
    ) -> ResolveResult<Resolved> {
        self.container.resolve_symbol_for_provider(name, provider)
    }

    fn resolve_resource_for_provider(
        &self,
        path: &str,
        provider: &ProviderId,
    ) -> ResolveResult<Vec<Resolved>> {
        self.container.resolve_resource_for_provider(path, provider)
    }

    fn record_loaded(
        &self,
        consumer: &ConsumerId,
        name: &str,
        resolved: Resolved,
    ) -> ResolveResult<()> {
        self.container.record_loaded(consumer, name, resolved)
    }

    fn record_loaded_for_provider(
        &self,
        provider: &ProviderId,
        name: &str,
        resolved: Resolved,
    ) -> ResolveResult<()> {
        self.container
            .record_loaded_for_provider(provider, name, resolved)
    }
}
