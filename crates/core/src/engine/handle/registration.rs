use super::IsolationHandle;
use bulkhead_api::{
    ConsumerId, ConsumerSpec, ConsumerState, DenySpec, IndexStats, ProviderId, ProviderSpec,
    RegistrationService, ResolveResult,
};

impl RegistrationService for IsolationHandle {
    fn register_provider(&self, spec: ProviderSpec) -> ResolveResult<ProviderId> {
        self.container.register_provider(&spec)
    }

    fn register_consumer(&self, spec: ConsumerSpec) -> ResolveResult<ConsumerId> {
        self.container.register_consumer(&spec)
    }

    fn build_export_index(&self) -> IndexStats {
        self.container.build_export_index()
    }

    fn transition_consumer(&self, id: &ConsumerId, next: ConsumerState) -> ResolveResult<()> {
        self.container.transition_consumer(id, next)
    }

    fn update_deny_rules(&self, id: &ConsumerId, deny: DenySpec) -> ResolveResult<()> {
        self.container.update_deny_rules(id, &deny)
    }
}
