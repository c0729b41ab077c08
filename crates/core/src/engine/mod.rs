//! Isolation container: one registry, export index, resolver and cache set per
//! deployment context.
//!
//! The export index is published MVCC style:
//! - Readers take a cheap snapshot (`Arc` clone) and never block on a rebuild
//! - Rebuilds happen off to the side and are swapped in under a short write lock
//! - Every publish bumps the epoch, which is part of every cache key

use crate::cache::{CacheKey, ResolutionCache};
use crate::config::IsolationConfig;
use crate::index::ExportIndex;
use crate::registry::{ConsumerRecord, ProviderRecord, Registry};
use crate::resolver::{Resolver, Subject};
use bulkhead_api::{
    CacheStats, ConsumerId, ConsumerSpec, ConsumerState, DenySpec, IndexStats, InMemoryStore,
    LookupKind, ModuleRef, ModuleStore, ProviderId, ProviderSpec, Requester, ResolutionTier,
    ResolveError, ResolveResult, Resolved, SymbolOrigin,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod builder;
pub mod handle;

pub use builder::ContainerBuilder;
pub use handle::IsolationHandle;

/// Revision used in cache keys of provider-side lookups. Provider rules only
/// change through redeploy, which republishes the index.
const PROVIDER_REVISION: u64 = 0;

pub struct IsolationContainer {
    config: IsolationConfig,
    registry: Arc<Registry>,
    /// Current export index (double Arc for MVCC)
    current: RwLock<Arc<ExportIndex>>,
    epoch: AtomicU64,
    /// Serializes rebuilds; readers never take it.
    build_lock: Mutex<()>,
    resolver: Resolver,
    cache: ResolutionCache,
}

impl IsolationContainer {
    pub fn builder(config: IsolationConfig) -> ContainerBuilder {
        ContainerBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: IsolationConfig,
        registry: Arc<Registry>,
        resolver: Resolver,
    ) -> Self {
        let cache = ResolutionCache::new(&config.symbol_cache, &config.resource_cache);
        Self {
            config,
            registry,
            current: RwLock::new(Arc::new(ExportIndex::empty())),
            epoch: AtomicU64::new(0),
            build_lock: Mutex::new(()),
            resolver,
            cache,
        }
    }

    pub fn config(&self) -> &IsolationConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Snapshot of the published export index.
    pub fn snapshot(&self) -> Arc<ExportIndex> {
        self.current.read().clone()
    }

    // ---- Registration ----

    /// Register a provider whose store is seeded from `spec.contents`.
    pub fn register_provider(&self, spec: &ProviderSpec) -> ResolveResult<ProviderId> {
        let store = Arc::new(InMemoryStore::from(&spec.contents));
        self.register_provider_with_store(spec, store)
    }

    pub fn register_provider_with_store(
        &self,
        spec: &ProviderSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<ProviderId> {
        Ok(self.registry.register_provider(spec, store)?.id.clone())
    }

    /// Replace a provider and republish the index, since its old claims may be gone.
    pub fn redeploy_provider(
        &self,
        spec: &ProviderSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<ProviderId> {
        let id = self.registry.redeploy_provider(spec, store)?.id.clone();
        self.build_export_index();
        Ok(id)
    }

    pub fn register_consumer(&self, spec: &ConsumerSpec) -> ResolveResult<ConsumerId> {
        let store = Arc::new(InMemoryStore::from(&spec.contents));
        self.register_consumer_with_store(spec, store)
    }

    pub fn register_consumer_with_store(
        &self,
        spec: &ConsumerSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<ConsumerId> {
        let id = self.registry.register_consumer(spec, store)?.id.clone();
        // Consumers delegating to `id` may have cached its absence
        self.invalidate_consumer(&id);
        Ok(id)
    }

    pub fn redeploy_consumer(
        &self,
        spec: &ConsumerSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<ConsumerId> {
        let id = self.registry.redeploy_consumer(spec, store)?.id.clone();
        self.invalidate_consumer(&id);
        Ok(id)
    }

    /// Rebuild the index from every registered provider and publish it.
    pub fn build_export_index(&self) -> IndexStats {
        let _guard = self.build_lock.lock();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let providers = self.registry.providers_by_priority();
        let index = ExportIndex::build(epoch, providers.iter().map(|p| p.as_ref()));
        self.publish(index)
    }

    /// Index providers registered since the last publish without disturbing
    /// existing claims. A no-op when nothing is new.
    pub fn extend_export_index(&self) -> IndexStats {
        let _guard = self.build_lock.lock();
        let current = self.snapshot();
        let providers = self.registry.providers_by_priority();
        let mut next = current.as_ref().clone();
        if next.extend(providers.iter().map(|p| p.as_ref())) == 0 {
            return current.stats();
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(next.with_epoch(epoch))
    }

    fn publish(&self, index: ExportIndex) -> IndexStats {
        let stats = index.stats();
        *self.current.write() = Arc::new(index);
        // Old entries are already unreachable through the epoch; this reclaims them.
        self.cache.invalidate_all();
        tracing::info!(
            "Published export index epoch {} ({} providers, {} symbols, {} resources)",
            stats.epoch,
            stats.providers,
            stats.symbols,
            stats.resources
        );
        stats
    }

    // ---- Lifecycle ----

    pub fn transition_consumer(&self, id: &ConsumerId, next: ConsumerState) -> ResolveResult<()> {
        if next == ConsumerState::Destroyed {
            return self.destroy_consumer(id);
        }
        let consumer = self.registry.consumer(id)?;
        consumer.transition(next)?;
        if next == ConsumerState::Broken {
            tracing::warn!("Consumer {} marked broken", id);
        }
        Ok(())
    }

    /// Remove a consumer and purge everything cached on its behalf.
    pub fn destroy_consumer(&self, id: &ConsumerId) -> ResolveResult<()> {
        self.registry.remove_consumer(id)?;
        self.invalidate_consumer(id);
        Ok(())
    }

    /// Drop cached answers of `id` and of every consumer delegating to it.
    fn invalidate_consumer(&self, id: &ConsumerId) {
        self.cache.invalidate(&Requester::Consumer(id.clone()));
        for dependent in self.registry.dependents_of(id) {
            self.cache.invalidate(&Requester::Consumer(dependent));
        }
    }

    pub fn update_deny_rules(&self, id: &ConsumerId, deny: &DenySpec) -> ResolveResult<()> {
        self.registry.update_deny_rules(id, deny)?;
        self.cache.invalidate(&Requester::Consumer(id.clone()));
        Ok(())
    }

    // ---- Resolution ----

    fn live_consumer(&self, id: &ConsumerId) -> ResolveResult<Arc<ConsumerRecord>> {
        let consumer = self.registry.consumer(id)?;
        if consumer.state().is_terminal() {
            return Err(ResolveError::not_found(
                LookupKind::Consumer,
                id.as_str(),
                "registry",
            ));
        }
        Ok(consumer)
    }

    fn consumer_key(consumer: &ConsumerRecord, index: &ExportIndex, key: &str) -> CacheKey {
        CacheKey {
            requester: Requester::Consumer(consumer.id.clone()),
            index_epoch: index.epoch(),
            revision: consumer.revision(),
            key: key.to_string(),
        }
    }

    fn provider_key(provider: &ProviderRecord, index: &ExportIndex, key: &str) -> CacheKey {
        CacheKey {
            requester: Requester::Provider(provider.id.clone()),
            index_epoch: index.epoch(),
            revision: PROVIDER_REVISION,
            key: key.to_string(),
        }
    }

    pub fn resolve_symbol(&self, name: &str, consumer: &ConsumerId) -> ResolveResult<Resolved> {
        self.resolve_symbol_internal(name, consumer)
            .map_err(ResolveError::surface)
    }

    /// Like [`Self::resolve_symbol`] but keeps `DeniedByPolicy` distinguishable.
    pub fn resolve_symbol_internal(
        &self,
        name: &str,
        consumer: &ConsumerId,
    ) -> ResolveResult<Resolved> {
        let consumer = self.live_consumer(consumer)?;
        let index = self.snapshot();
        let key = Self::consumer_key(&consumer, &index, name);
        self.cache.get_symbol(key, || {
            self.resolver
                .resolve_symbol(&index, Subject::Consumer(&consumer), name)
        })
    }

    pub fn resolve_resource(&self, path: &str, consumer: &ConsumerId) -> ResolveResult<Vec<Resolved>> {
        let consumer = self.live_consumer(consumer)?;
        let index = self.snapshot();
        let key = Self::consumer_key(&consumer, &index, path);
        let hits = self.cache.get_resources(key, || {
            self.resolver
                .resolve_resource(&index, Subject::Consumer(&consumer), path)
        })?;
        Ok(hits.to_vec())
    }

    pub fn find_resource(&self, path: &str, consumer: &ConsumerId) -> ResolveResult<Option<Resolved>> {
        Ok(self.resolve_resource(path, consumer)?.into_iter().next())
    }

    pub fn resolve_symbol_for_provider(
        &self,
        name: &str,
        provider: &ProviderId,
    ) -> ResolveResult<Resolved> {
        let provider = self.registry.provider(provider)?;
        let index = self.snapshot();
        let key = Self::provider_key(&provider, &index, name);
        self.cache
            .get_symbol(key, || {
                self.resolver
                    .resolve_symbol(&index, Subject::Provider(&provider), name)
            })
            .map_err(ResolveError::surface)
    }

    pub fn resolve_resource_for_provider(
        &self,
        path: &str,
        provider: &ProviderId,
    ) -> ResolveResult<Vec<Resolved>> {
        let provider = self.registry.provider(provider)?;
        let index = self.snapshot();
        let key = Self::provider_key(&provider, &index, path);
        let hits = self.cache.get_resources(key, || {
            self.resolver
                .resolve_resource(&index, Subject::Provider(&provider), path)
        })?;
        Ok(hits.to_vec())
    }

    /// Remember what the loader materialized; later lookups answer from the Loaded tier.
    pub fn record_loaded(
        &self,
        consumer: &ConsumerId,
        name: &str,
        resolved: Resolved,
    ) -> ResolveResult<()> {
        let consumer = self.live_consumer(consumer)?;
        consumer.record_loaded(name, resolved);
        let index = self.snapshot();
        self.cache
            .invalidate_symbol(&Self::consumer_key(&consumer, &index, name));
        Ok(())
    }

    pub fn record_loaded_for_provider(
        &self,
        provider: &ProviderId,
        name: &str,
        resolved: Resolved,
    ) -> ResolveResult<()> {
        let provider = self.registry.provider(provider)?;
        provider.record_loaded(name, resolved);
        let index = self.snapshot();
        self.cache
            .invalidate_symbol(&Self::provider_key(&provider, &index, name));
        Ok(())
    }

    // ---- Introspection ----

    pub fn describe_symbol(&self, name: &str, consumer: &ConsumerId) -> ResolveResult<SymbolOrigin> {
        let record = self.live_consumer(consumer)?;
        let resolved = self.resolve_symbol(name, consumer)?;

        let requester = Requester::Consumer(record.id.clone());
        let mut ancestry = vec![ModuleRef::from(&requester)];
        if resolved.tier == ResolutionTier::Delegate {
            if let Some(delegate) = &record.delegate {
                ancestry.push(ModuleRef::Consumer(delegate.clone()));
            }
        }
        if ancestry.last() != Some(&resolved.module) {
            ancestry.push(resolved.module.clone());
        }

        let provider = resolved
            .module
            .provider()
            .and_then(|id| self.registry.provider(id).ok())
            .map(|p| p.summary());

        Ok(SymbolOrigin {
            symbol: name.to_string(),
            requester,
            loaded: record.loaded(name),
            resolved,
            provider,
            ancestry,
        })
    }

    pub fn loaded_symbols(&self, consumer: &ConsumerId) -> ResolveResult<Vec<(String, Resolved)>> {
        Ok(self.live_consumer(consumer)?.loaded_symbols())
    }

    pub fn consumer_state(&self, consumer: &ConsumerId) -> ResolveResult<ConsumerState> {
        Ok(self.registry.consumer(consumer)?.state())
    }

    pub fn index_stats(&self) -> IndexStats {
        self.snapshot().stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
