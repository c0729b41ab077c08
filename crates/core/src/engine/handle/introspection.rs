use super::IsolationHandle;
use bulkhead_api::{
    CacheStats, ConsumerId, ConsumerState, IndexStats, IntrospectionService, ResolveResult,
    Resolved, SymbolOrigin,
};

impl IntrospectionService for IsolationHandle {
    fn describe_symbol(&self, name: &str, consumer: &ConsumerId) -> ResolveResult<SymbolOrigin> {
        self.container.describe_symbol(name, consumer)
    }

    fn loaded_symbols(&self, consumer: &ConsumerId) -> ResolveResult<Vec<(String, Resolved)>> {
        self.container.loaded_symbols(consumer)
    }

    fn consumer_state(&self, consumer: &ConsumerId) -> ResolveResult<ConsumerState> {
        self.container.consumer_state(consumer)
    }

    fn index_stats(&self) -> IndexStats {
        self.container.index_stats()
    }

    fn cache_stats(&self) -> CacheStats {
        self.container.cache_stats()
    }
}
