//! Registry of providers and consumers for one container.
//!
//! Records are referenced by identity strings and shared as `Arc`s; a record
//! never points at another record directly.

use crate::visibility::{ModuleRules, RuleMatch};
use bulkhead_api::{
    ConsumerId, ConsumerSpec, ConsumerState, DenySpec, LookupKind, ModuleStore, ProviderId,
    ProviderSpec, ProviderSummary, ResolveError, ResolveResult, Resolved,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

mod lifecycle;

const REGISTRY: &str = "registry";

pub struct ProviderRecord {
    pub id: ProviderId,
    pub version: String,
    pub priority: i32,
    /// Registration order, used as the priority tie-break.
    pub seq: u64,
    pub exports: ModuleRules,
    pub imports: ModuleRules,
    store: Arc<dyn ModuleStore>,
    loaded: DashMap<String, Resolved>,
}

impl ProviderRecord {
    fn compile(spec: &ProviderSpec, seq: u64, store: Arc<dyn ModuleStore>) -> ResolveResult<Self> {
        Ok(Self {
            id: spec.id(),
            version: spec.version.clone(),
            priority: spec.priority,
            seq,
            exports: ModuleRules::compile(&spec.exports)?,
            imports: ModuleRules::compile(&spec.imports)?,
            store,
            loaded: DashMap::new(),
        })
    }

    pub fn store(&self) -> &dyn ModuleStore {
        self.store.as_ref()
    }

    pub fn summary(&self) -> ProviderSummary {
        ProviderSummary {
            id: self.id.clone(),
            version: self.version.clone(),
            priority: self.priority,
        }
    }

    pub fn loaded(&self, name: &str) -> Option<Resolved> {
        self.loaded.get(name).map(|r| r.clone())
    }

    pub fn record_loaded(&self, name: &str, resolved: Resolved) {
        self.loaded.insert(name.to_string(), resolved);
    }
}

pub struct ConsumerRecord {
    pub id: ConsumerId,
    pub delegate: Option<ConsumerId>,
    deny: RwLock<Arc<ModuleRules>>,
    /// Changes whenever the deny-list changes; part of every cache key.
    revision: AtomicU64,
    state: Mutex<ConsumerState>,
    store: Arc<dyn ModuleStore>,
    loaded: DashMap<String, Resolved>,
}

impl ConsumerRecord {
    fn compile(spec: &ConsumerSpec, revision: u64, store: Arc<dyn ModuleStore>) -> ResolveResult<Self> {
        Ok(Self {
            id: spec.id(),
            delegate: spec.delegate.clone(),
            deny: RwLock::new(Arc::new(ModuleRules::compile(&spec.deny)?)),
            revision: AtomicU64::new(revision),
            state: Mutex::new(ConsumerState::Registered),
            store,
            loaded: DashMap::new(),
        })
    }

    pub fn store(&self) -> &dyn ModuleStore {
        self.store.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn denied_symbol(&self, name: &str) -> Option<RuleMatch> {
        self.deny.read().symbols.find_match(name)
    }

    pub fn denied_resource(&self, path: &str) -> Option<RuleMatch> {
        self.deny.read().resources.find_match(path)
    }

    pub fn loaded(&self, name: &str) -> Option<Resolved> {
        self.loaded.get(name).map(|r| r.clone())
    }

    pub fn record_loaded(&self, name: &str, resolved: Resolved) {
        self.loaded.insert(name.to_string(), resolved);
    }

    pub fn loaded_symbols(&self) -> Vec<(String, Resolved)> {
        let mut symbols: Vec<_> = self
            .loaded
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        symbols
    }
}

/// Thread-safe table of registered modules.
#[derive(Default)]
pub struct Registry {
    providers: DashMap<ProviderId, Arc<ProviderRecord>>,
    consumers: DashMap<ConsumerId, Arc<ConsumerRecord>>,
    /// Shared source for registration order and deny-list revisions.
    sequence: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a new provider. A second registration under the same name is rejected.
    pub fn register_provider(
        &self,
        spec: &ProviderSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<Arc<ProviderRecord>> {
        let record = Arc::new(ProviderRecord::compile(spec, self.next_sequence(), store)?);
        match self.providers.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(ResolveError::AmbiguousRegistration {
                kind: LookupKind::Provider,
                identity: spec.name.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                tracing::info!(
                    "Registered provider {} {} (priority {})",
                    record.id,
                    record.version,
                    record.priority
                );
                Ok(record)
            }
        }
    }

    /// Replace a provider, keeping its original registration order if it existed.
    pub fn redeploy_provider(
        &self,
        spec: &ProviderSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<Arc<ProviderRecord>> {
        let id = spec.id();
        let seq = match self.providers.get(&id) {
            Some(existing) => existing.seq,
            None => self.next_sequence(),
        };
        let record = Arc::new(ProviderRecord::compile(spec, seq, store)?);
        if self.providers.insert(id, record.clone()).is_some() {
            tracing::warn!("Redeployed provider {} {}", record.id, record.version);
        }
        Ok(record)
    }

    pub fn register_consumer(
        &self,
        spec: &ConsumerSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<Arc<ConsumerRecord>> {
        let record = Arc::new(ConsumerRecord::compile(spec, self.next_sequence(), store)?);
        match self.consumers.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(ResolveError::AmbiguousRegistration {
                kind: LookupKind::Consumer,
                identity: record.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                tracing::info!("Registered consumer {}", record.id);
                Ok(record)
            }
        }
    }

    pub fn redeploy_consumer(
        &self,
        spec: &ConsumerSpec,
        store: Arc<dyn ModuleStore>,
    ) -> ResolveResult<Arc<ConsumerRecord>> {
        let record = Arc::new(ConsumerRecord::compile(spec, self.next_sequence(), store)?);
        if let Some(previous) = self.consumers.insert(record.id.clone(), record.clone()) {
            previous.force_state(ConsumerState::Destroyed);
            tracing::warn!("Redeployed consumer {}", record.id);
        }
        Ok(record)
    }

    pub fn provider(&self, id: &ProviderId) -> ResolveResult<Arc<ProviderRecord>> {
        self.providers
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| ResolveError::not_found(LookupKind::Provider, id.as_str(), REGISTRY))
    }

    pub fn provider_by_name(&self, name: &str) -> ResolveResult<Arc<ProviderRecord>> {
        self.provider(&ProviderId::new(name))
    }

    pub fn consumer(&self, id: &ConsumerId) -> ResolveResult<Arc<ConsumerRecord>> {
        self.consumers
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| ResolveError::not_found(LookupKind::Consumer, id.as_str(), REGISTRY))
    }

    /// All providers, lowest priority value first, registration order breaking ties.
    pub fn providers_by_priority(&self) -> Vec<Arc<ProviderRecord>> {
        let mut providers: Vec<_> = self.providers.iter().map(|r| r.value().clone()).collect();
        providers.sort_by_key(|p| (p.priority, p.seq));
        providers
    }

    /// Consumers naming `id` as their delegate.
    pub fn dependents_of(&self, id: &ConsumerId) -> Vec<ConsumerId> {
        self.consumers
            .iter()
            .filter(|entry| entry.value().delegate.as_ref() == Some(id))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_denied_symbol(&self, consumer: &ConsumerId, name: &str) -> ResolveResult<bool> {
        Ok(self.consumer(consumer)?.denied_symbol(name).is_some())
    }

    pub fn is_denied_resource(&self, consumer: &ConsumerId, path: &str) -> ResolveResult<bool> {
        Ok(self.consumer(consumer)?.denied_resource(path).is_some())
    }

    /// Replace a consumer's deny-list. Returns the new revision.
    pub fn update_deny_rules(&self, id: &ConsumerId, deny: &DenySpec) -> ResolveResult<u64> {
        let consumer = self.consumer(id)?;
        let rules = Arc::new(ModuleRules::compile(deny)?);
        let revision = {
            let mut guard = consumer.deny.write();
            *guard = rules;
            let revision = self.next_sequence();
            consumer.revision.store(revision, Ordering::Release);
            revision
        };
        tracing::info!("Updated deny rules of consumer {} (revision {})", id, revision);
        Ok(revision)
    }

    /// Destroy a consumer and drop it from the table.
    pub fn remove_consumer(&self, id: &ConsumerId) -> ResolveResult<Arc<ConsumerRecord>> {
        let consumer = self.consumer(id)?;
        consumer.transition(ConsumerState::Destroyed)?;
        self.consumers.remove(id);
        tracing::info!("Destroyed consumer {}", id);
        Ok(consumer)
    }
}
