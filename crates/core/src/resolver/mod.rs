//! Tiered symbol and resource resolution.
//!
//! A lookup walks a fixed chain of [`ResolutionTier`]s. Each tier is evaluated on
//! its own and either yields a hit or passes to the next one; only exhausting the
//! whole chain is an error. Resource lookups collect every tier's hits instead
//! of stopping at the first.

use crate::config::DenyMode;
use crate::index::ExportIndex;
use crate::registry::{ConsumerRecord, ProviderRecord, Registry};
use crate::visibility::SymbolRules;
use bulkhead_api::{
    LookupKind, ModuleRef, ModuleStore, Requester, ResolutionTier, ResolveError, ResolveResult,
    Resolved,
};
use std::sync::Arc;

mod host;

pub use host::HostStores;

pub const CONSUMER_SYMBOL_CHAIN: &[ResolutionTier] = &[
    ResolutionTier::Loaded,
    ResolutionTier::Runtime,
    ResolutionTier::Framework,
    ResolutionTier::ExportIndex,
    ResolutionTier::Local,
    ResolutionTier::Delegate,
    ResolutionTier::Agent,
    ResolutionTier::System,
];

pub const PROVIDER_SYMBOL_CHAIN: &[ResolutionTier] = &[
    ResolutionTier::Loaded,
    ResolutionTier::Runtime,
    ResolutionTier::Framework,
    ResolutionTier::Import,
    ResolutionTier::Local,
    ResolutionTier::Agent,
    ResolutionTier::System,
];

pub const CONSUMER_RESOURCE_CHAIN: &[ResolutionTier] = &[
    ResolutionTier::ExportIndex,
    ResolutionTier::Local,
    ResolutionTier::Delegate,
    ResolutionTier::Runtime,
    ResolutionTier::Agent,
];

pub const PROVIDER_RESOURCE_CHAIN: &[ResolutionTier] = &[
    ResolutionTier::Import,
    ResolutionTier::Local,
    ResolutionTier::Runtime,
    ResolutionTier::Agent,
];

/// The module a lookup runs for.
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    Consumer(&'a ConsumerRecord),
    Provider(&'a ProviderRecord),
}

impl Subject<'_> {
    pub fn requester(&self) -> Requester {
        match self {
            Subject::Consumer(c) => Requester::Consumer(c.id.clone()),
            Subject::Provider(p) => Requester::Provider(p.id.clone()),
        }
    }

    fn module(&self) -> ModuleRef {
        match self {
            Subject::Consumer(c) => ModuleRef::Consumer(c.id.clone()),
            Subject::Provider(p) => ModuleRef::Provider(p.id.clone()),
        }
    }

    fn store(&self) -> &dyn ModuleStore {
        match self {
            Subject::Consumer(c) => c.store(),
            Subject::Provider(p) => p.store(),
        }
    }

    fn loaded(&self, name: &str) -> Option<Resolved> {
        match self {
            Subject::Consumer(c) => c.loaded(name),
            Subject::Provider(p) => p.loaded(name),
        }
    }
}

enum TierOutcome {
    Hit(Resolved),
    Miss,
    /// The tier had an answer but policy withheld it.
    Denied,
}

impl TierOutcome {
    fn hit_if(found: bool, module: impl FnOnce() -> ModuleRef, tier: ResolutionTier) -> Self {
        if found {
            TierOutcome::Hit(Resolved::new(module(), tier))
        } else {
            TierOutcome::Miss
        }
    }
}

impl From<Option<Resolved>> for TierOutcome {
    fn from(value: Option<Resolved>) -> Self {
        value.map_or(TierOutcome::Miss, TierOutcome::Hit)
    }
}

pub struct Resolver {
    registry: Arc<Registry>,
    hosts: HostStores,
    framework: SymbolRules,
    deny_mode: DenyMode,
}

impl Resolver {
    pub fn new(
        registry: Arc<Registry>,
        hosts: HostStores,
        framework: SymbolRules,
        deny_mode: DenyMode,
    ) -> Self {
        Self {
            registry,
            hosts,
            framework,
            deny_mode,
        }
    }

    pub fn resolve_symbol(
        &self,
        index: &ExportIndex,
        subject: Subject<'_>,
        name: &str,
    ) -> ResolveResult<Resolved> {
        let chain = match subject {
            Subject::Consumer(_) => CONSUMER_SYMBOL_CHAIN,
            Subject::Provider(_) => PROVIDER_SYMBOL_CHAIN,
        };

        let mut denied = false;
        for &tier in chain {
            match self.symbol_tier(tier, index, subject, name) {
                TierOutcome::Hit(resolved) => {
                    tracing::debug!(
                        "Resolved symbol {} for {} via {} ({})",
                        name,
                        subject.requester(),
                        resolved.tier,
                        resolved.module
                    );
                    return Ok(resolved);
                }
                TierOutcome::Denied => denied = true,
                TierOutcome::Miss => {}
            }
        }

        let requester = subject.requester().to_string();
        Err(if denied {
            ResolveError::DeniedByPolicy {
                kind: LookupKind::Symbol,
                key: name.to_string(),
                requester,
            }
        } else {
            ResolveError::not_found(LookupKind::Symbol, name, requester)
        })
    }

    /// Every module serving `path`, in chain order. Empty when nothing matches.
    pub fn resolve_resource(
        &self,
        index: &ExportIndex,
        subject: Subject<'_>,
        path: &str,
    ) -> Vec<Resolved> {
        let chain = match subject {
            Subject::Consumer(_) => CONSUMER_RESOURCE_CHAIN,
            Subject::Provider(_) => PROVIDER_RESOURCE_CHAIN,
        };

        let mut hits = Vec::new();
        for &tier in chain {
            self.resource_tier(tier, index, subject, path, &mut hits);
        }
        hits
    }

    fn symbol_tier(
        &self,
        tier: ResolutionTier,
        index: &ExportIndex,
        subject: Subject<'_>,
        name: &str,
    ) -> TierOutcome {
        match tier {
            ResolutionTier::Loaded => subject
                .loaded(name)
                .map(|recorded| Resolved::new(recorded.module, ResolutionTier::Loaded))
                .into(),
            ResolutionTier::Runtime => TierOutcome::hit_if(
                self.hosts.runtime.contains_symbol(name),
                || ModuleRef::Runtime,
                tier,
            ),
            ResolutionTier::Framework => TierOutcome::hit_if(
                self.framework.matches(name) && self.hosts.framework.contains_symbol(name),
                || ModuleRef::Framework,
                tier,
            ),
            ResolutionTier::ExportIndex => {
                let Subject::Consumer(consumer) = subject else {
                    return TierOutcome::Miss;
                };
                if self.symbol_denied(consumer, name) {
                    return TierOutcome::Denied;
                }
                index
                    .find_symbol(name)
                    .map(|provider| Resolved::provider(provider.clone(), tier))
                    .into()
            }
            ResolutionTier::Import => {
                let Subject::Provider(provider) = subject else {
                    return TierOutcome::Miss;
                };
                if !provider.imports.symbols.matches(name) {
                    return TierOutcome::Miss;
                }
                index
                    .find_symbol(name)
                    .map(|exporter| Resolved::provider(exporter.clone(), tier))
                    .into()
            }
            ResolutionTier::Local => {
                TierOutcome::hit_if(subject.store().contains_symbol(name), || subject.module(), tier)
            }
            ResolutionTier::Delegate => match self.delegate_of(subject) {
                Some(delegate) => TierOutcome::hit_if(
                    delegate.store().contains_symbol(name),
                    || ModuleRef::Consumer(delegate.id.clone()),
                    tier,
                ),
                None => TierOutcome::Miss,
            },
            ResolutionTier::Agent => TierOutcome::hit_if(
                self.hosts.agent.contains_symbol(name),
                || ModuleRef::Agent,
                tier,
            ),
            ResolutionTier::System => TierOutcome::hit_if(
                self.hosts.system.contains_symbol(name),
                || ModuleRef::System,
                tier,
            ),
        }
    }

    fn resource_tier(
        &self,
        tier: ResolutionTier,
        index: &ExportIndex,
        subject: Subject<'_>,
        path: &str,
        hits: &mut Vec<Resolved>,
    ) {
        let single = match tier {
            ResolutionTier::ExportIndex => {
                let Subject::Consumer(consumer) = subject else {
                    return;
                };
                if self.resource_denied(consumer, path) {
                    return;
                }
                extend_from_index(index, path, tier, hits);
                None
            }
            ResolutionTier::Import => {
                let Subject::Provider(provider) = subject else {
                    return;
                };
                if provider.imports.resources.matches(path) {
                    extend_from_index(index, path, tier, hits);
                }
                None
            }
            ResolutionTier::Local => subject
                .store()
                .contains_resource(path)
                .then(|| subject.module()),
            ResolutionTier::Delegate => self
                .delegate_of(subject)
                .filter(|delegate| delegate.store().contains_resource(path))
                .map(|delegate| ModuleRef::Consumer(delegate.id.clone())),
            ResolutionTier::Runtime => self
                .hosts
                .runtime
                .contains_resource(path)
                .then_some(ModuleRef::Runtime),
            ResolutionTier::Agent => self
                .hosts
                .agent
                .contains_resource(path)
                .then_some(ModuleRef::Agent),
            ResolutionTier::System => self
                .hosts
                .system
                .contains_resource(path)
                .then_some(ModuleRef::System),
            ResolutionTier::Loaded | ResolutionTier::Framework => None,
        };

        if let Some(module) = single {
            hits.push(Resolved::new(module, tier));
        }
    }

    fn delegate_of(&self, subject: Subject<'_>) -> Option<Arc<ConsumerRecord>> {
        let Subject::Consumer(consumer) = subject else {
            return None;
        };
        let delegate = consumer.delegate.as_ref()?;
        match self.registry.consumer(delegate) {
            Ok(record) => Some(record),
            Err(_) => {
                tracing::debug!(
                    "Delegate {} of consumer {} is not registered",
                    delegate,
                    consumer.id
                );
                None
            }
        }
    }

    fn symbol_denied(&self, consumer: &ConsumerRecord, name: &str) -> bool {
        let Some(rule) = consumer.denied_symbol(name) else {
            return false;
        };
        match self.deny_mode {
            DenyMode::Strict => {
                tracing::debug!(
                    "Symbol {} denied to consumer {} by {} rule",
                    name,
                    consumer.id,
                    rule
                );
                true
            }
            DenyMode::Permissive => {
                tracing::warn!(
                    "Symbol {} matches a {} deny rule of consumer {}; allowed in permissive mode",
                    name,
                    rule,
                    consumer.id
                );
                false
            }
        }
    }

    fn resource_denied(&self, consumer: &ConsumerRecord, path: &str) -> bool {
        let Some(rule) = consumer.denied_resource(path) else {
            return false;
        };
        match self.deny_mode {
            DenyMode::Strict => {
                tracing::debug!(
                    "Resource {} denied to consumer {} by {} rule",
                    path,
                    consumer.id,
                    rule
                );
                true
            }
            DenyMode::Permissive => {
                tracing::warn!(
                    "Resource {} matches a {} deny rule of consumer {}; allowed in permissive mode",
                    path,
                    rule,
                    consumer.id
                );
                false
            }
        }
    }
}

fn extend_from_index(
    index: &ExportIndex,
    path: &str,
    tier: ResolutionTier,
    hits: &mut Vec<Resolved>,
) {
    if let Some(providers) = index.find_resource(path) {
        hits.extend(
            providers
                .iter()
                .map(|p| Resolved::provider(p.clone(), tier)),
        );
    }
}

#[cfg(test)]
mod tests;
