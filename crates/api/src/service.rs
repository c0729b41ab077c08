use crate::error::ResolveResult;
use crate::models::{
    ConsumerId, ConsumerSpec, ConsumerState, DenySpec, ProviderId, ProviderSpec, Resolved,
    SymbolOrigin,
};
use crate::stats::{CacheStats, IndexStats};

/// Deployment-time surface used by the packaging collaborator.
pub trait RegistrationService: Send + Sync {
    fn register_provider(&self, spec: ProviderSpec) -> ResolveResult<ProviderId>;

    fn register_consumer(&self, spec: ConsumerSpec) -> ResolveResult<ConsumerId>;

    /// Rebuild the export index from every registered provider. Idempotent.
    fn build_export_index(&self) -> IndexStats;

    fn transition_consumer(&self, id: &ConsumerId, next: ConsumerState) -> ResolveResult<()>;

    fn update_deny_rules(&self, id: &ConsumerId, deny: DenySpec) -> ResolveResult<()>;
}

/// Lookup surface used by the module-loading collaborator.
pub trait ResolutionService: Send + Sync {
    fn resolve_symbol(&self, name: &str, consumer: &ConsumerId) -> ResolveResult<Resolved>;

    /// Every module serving `path`, export-index hits first in provider priority order.
    fn resolve_resource(&self, path: &str, consumer: &ConsumerId) -> ResolveResult<Vec<Resolved>>;

    fn find_resource(&self, path: &str, consumer: &ConsumerId) -> ResolveResult<Option<Resolved>>;

    fn resolve_symbol_for_provider(
        &self,
        name: &str,
        provider: &ProviderId,
    ) -> ResolveResult<Resolved>;

    fn resolve_resource_for_provider(
        &self,
        path: &str,
        provider: &ProviderId,
    ) -> ResolveResult<Vec<Resolved>>;

    /// Record that `name` has been materialized for `consumer` from `resolved`.
    fn record_loaded(
        &self,
        consumer: &ConsumerId,
        name: &str,
        resolved: Resolved,
    ) -> ResolveResult<()>;

    /// Provider-side counterpart of [`ResolutionService::record_loaded`].
    fn record_loaded_for_provider(
        &self,
        provider: &ProviderId,
        name: &str,
        resolved: Resolved,
    ) -> ResolveResult<()>;
}

/// Read-only metadata for diagnostic collaborators.
pub trait IntrospectionService: Send + Sync {
    fn describe_symbol(&self, name: &str, consumer: &ConsumerId) -> ResolveResult<SymbolOrigin>;

    fn loaded_symbols(&self, consumer: &ConsumerId) -> ResolveResult<Vec<(String, Resolved)>>;

    fn consumer_state(&self, consumer: &ConsumerId) -> ResolveResult<ConsumerState>;

    fn index_stats(&self) -> IndexStats;

    fn cache_stats(&self) -> CacheStats;
}
