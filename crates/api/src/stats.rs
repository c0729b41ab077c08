use serde::{Deserialize, Serialize};

/// Counters for one resolution cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    pub hits: u64,
    /// Lookups that ran the fallback chain.
    pub misses: u64,
    /// Approximate; expired entries are reclaimed lazily.
    pub entries: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub symbols: CacheCounters,
    pub resources: CacheCounters,
}

/// Sizes of the published export index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub epoch: u64,
    pub providers: usize,
    pub symbols: usize,
    pub namespace_nodes: usize,
    pub namespace_stems: usize,
    pub resources: usize,
    pub resource_prefixes: usize,
    pub resource_suffixes: usize,
}
