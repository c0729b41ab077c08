use super::identity::{ConsumerId, ProviderId, Requester};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Symbol,
    Resource,
    Provider,
    Consumer,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupKind::Symbol => "symbol",
            LookupKind::Resource => "resource",
            LookupKind::Provider => "provider",
            LookupKind::Consumer => "consumer",
        };
        f.write_str(s)
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// Already materialized for the requester.
    Loaded,
    /// Base symbols owned by the hosting runtime.
    Runtime,
    /// Reserved namespaces of the isolation framework itself.
    Framework,
    /// Provider exports, gated by the consumer's deny-list.
    ExportIndex,
    /// Provider exports reached through a provider's own import declarations.
    Import,
    /// The requester's own store.
    Local,
    /// The store of the consumer's delegate (master consumer).
    Delegate,
    /// Symbols injected by the host process outside the isolation system.
    Agent,
    /// Final system-level fallback.
    System,
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionTier::Loaded => "loaded",
            ResolutionTier::Runtime => "runtime",
            ResolutionTier::Framework => "framework",
            ResolutionTier::ExportIndex => "export-index",
            ResolutionTier::Import => "import",
            ResolutionTier::Local => "local",
            ResolutionTier::Delegate => "delegate",
            ResolutionTier::Agent => "agent",
            ResolutionTier::System => "system",
        };
        f.write_str(s)
    }
}

/// The module a lookup ended up at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ModuleRef {
    Provider(ProviderId),
    Consumer(ConsumerId),
    Runtime,
    Framework,
    Agent,
    System,
}

impl ModuleRef {
    pub fn provider(&self) -> Option<&ProviderId> {
        match self {
            ModuleRef::Provider(id) => Some(id),
            _ => None,
        }
    }
}

impl From<&Requester> for ModuleRef {
    fn from(requester: &Requester) -> Self {
        match requester {
            Requester::Consumer(id) => ModuleRef::Consumer(id.clone()),
            Requester::Provider(id) => ModuleRef::Provider(id.clone()),
        }
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleRef::Provider(id) => write!(f, "provider:{id}"),
            ModuleRef::Consumer(id) => write!(f, "consumer:{id}"),
            ModuleRef::Runtime => f.write_str("runtime"),
            ModuleRef::Framework => f.write_str("framework"),
            ModuleRef::Agent => f.write_str("agent"),
            ModuleRef::System => f.write_str("system"),
        }
    }
}

/// Outcome of a successful lookup: who serves it, and which tier found it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolved {
    pub module: ModuleRef,
    pub tier: ResolutionTier,
}

impl Resolved {
    pub fn new(module: ModuleRef, tier: ResolutionTier) -> Self {
        Self { module, tier }
    }

    pub fn provider(id: ProviderId, tier: ResolutionTier) -> Self {
        Self::new(ModuleRef::Provider(id), tier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub id: ProviderId,
    pub version: String,
    pub priority: i32,
}

/// Diagnostic view of where a symbol comes from for a given requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolOrigin {
    pub symbol: String,
    pub requester: Requester,
    pub resolved: Resolved,
    /// What the module-loading collaborator recorded when it materialized the symbol.
    pub loaded: Option<Resolved>,
    /// Set when the serving module is a registered provider.
    pub provider: Option<ProviderSummary>,
    /// Modules traversed from the requester to the serving module.
    pub ancestry: Vec<ModuleRef>,
}
