//! Export index: which provider serves which symbol or resource.
//!
//! ```text
//! providers (priority order) ──▶ symbols / nodes / stems      first claim wins
//!                            └─▶ resources / prefixes / suffixes   ordered provider lists
//! ```
//!
//! An index is immutable once published. A rebuild produces a new index that
//! replaces the old snapshot.

use crate::registry::ProviderRecord;
use crate::visibility::{namespace_of, parent_namespace};
use bulkhead_api::{IndexStats, ProviderId};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

#[derive(Debug, Clone, Default)]
pub struct ExportIndex {
    epoch: u64,
    symbols: HashMap<String, ProviderId>,
    nodes: HashMap<String, ProviderId>,
    stems: HashMap<String, ProviderId>,
    resources: HashMap<String, Vec<ProviderId>>,
    /// Insertion ordered: the first matching stem wins.
    resource_prefixes: IndexMap<String, Vec<ProviderId>>,
    resource_suffixes: IndexMap<String, Vec<ProviderId>>,
    indexed: IndexSet<ProviderId>,
}

impl ExportIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from scratch. `providers` must already be in priority order.
    pub fn build<'a>(epoch: u64, providers: impl IntoIterator<Item = &'a ProviderRecord>) -> Self {
        let mut index = Self {
            epoch,
            ..Self::default()
        };
        index.extend(providers);
        index
    }

    /// Index providers not seen before, leaving existing entries untouched.
    /// Returns how many providers were added.
    pub fn extend<'a>(&mut self, providers: impl IntoIterator<Item = &'a ProviderRecord>) -> usize {
        let mut added = 0;
        for provider in providers {
            if self.indexed.contains(&provider.id) {
                continue;
            }
            self.index_provider(provider);
            added += 1;
        }
        added
    }

    fn index_provider(&mut self, provider: &ProviderRecord) {
        let id = &provider.id;
        let exports = &provider.exports;

        for symbol in exports.symbols.symbols() {
            claim(&mut self.symbols, symbol, id, "symbol");
        }
        for node in exports.symbols.nodes() {
            claim(&mut self.nodes, node, id, "namespace node");
        }
        for stem in exports.symbols.stems() {
            claim(&mut self.stems, stem, id, "namespace stem");
        }

        for path in exports.resources.exact() {
            self.resources
                .entry(path.to_string())
                .or_default()
                .push(id.clone());
        }
        for prefix in exports.resources.prefixes() {
            self.resource_prefixes
                .entry(prefix.to_string())
                .or_default()
                .push(id.clone());
        }
        for suffix in exports.resources.suffixes() {
            self.resource_suffixes
                .entry(suffix.to_string())
                .or_default()
                .push(id.clone());
        }

        self.indexed.insert(id.clone());
        tracing::debug!("Indexed exports of provider {}", id);
    }

    /// Exact symbol first; otherwise the node map at the symbol's namespace, then
    /// the stem map walking outward one segment at a time. The root namespace is
    /// never consulted.
    pub fn find_symbol(&self, name: &str) -> Option<&ProviderId> {
        if let Some(provider) = self.symbols.get(name) {
            return Some(provider);
        }

        let mut namespace = namespace_of(name);
        if namespace.is_empty() {
            return None;
        }
        if let Some(provider) = self.nodes.get(namespace) {
            return Some(provider);
        }
        loop {
            if let Some(provider) = self.stems.get(namespace) {
                return Some(provider);
            }
            namespace = parent_namespace(namespace)?;
        }
    }

    /// Exact path; else the first prefix stem `path` starts with; else the first
    /// suffix stem it ends with. Providers come back in priority order.
    pub fn find_resource(&self, path: &str) -> Option<&[ProviderId]> {
        if let Some(providers) = self.resources.get(path) {
            return Some(providers);
        }
        if let Some((_, providers)) = self
            .resource_prefixes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
        {
            return Some(providers);
        }
        self.resource_suffixes
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, providers)| providers.as_slice())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            epoch: self.epoch,
            providers: self.indexed.len(),
            symbols: self.symbols.len(),
            namespace_nodes: self.nodes.len(),
            namespace_stems: self.stems.len(),
            resources: self.resources.len(),
            resource_prefixes: self.resource_prefixes.len(),
            resource_suffixes: self.resource_suffixes.len(),
        }
    }
}

/// Put-if-absent. Losing claims are dropped.
fn claim(map: &mut HashMap<String, ProviderId>, key: &str, provider: &ProviderId, what: &str) {
    match map.entry(key.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(provider.clone());
        }
        Entry::Occupied(winner) => {
            tracing::debug!(
                "Ignoring {} export '{}' from {}: already claimed by {}",
                what,
                key,
                provider,
                winner.get()
            );
        }
    }
}

#[cfg(test)]
mod tests;
