use crate::models::StoreContents;
use std::collections::HashSet;

/// A module's own symbol/resource store.
///
/// The isolation core only asks whether something is present; materializing it is
/// the job of the module-loading collaborator.
pub trait ModuleStore: Send + Sync {
    fn contains_symbol(&self, name: &str) -> bool;

    fn contains_resource(&self, path: &str) -> bool;
}

/// A store that holds nothing. Default for host tiers that are not wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyStore;

impl ModuleStore for EmptyStore {
    fn contains_symbol(&self, _name: &str) -> bool {
        false
    }

    fn contains_resource(&self, _path: &str) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    symbols: HashSet<String>,
    resources: HashSet<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols.extend(symbols.into_iter().map(Into::into));
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len() + self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&StoreContents> for InMemoryStore {
    fn from(contents: &StoreContents) -> Self {
        InMemoryStore::new()
            .with_symbols(contents.symbols.iter().cloned())
            .with_resources(contents.resources.iter().cloned())
    }
}

impl ModuleStore for InMemoryStore {
    fn contains_symbol(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    fn contains_resource(&self, path: &str) -> bool {
        self.resources.contains(path)
    }
}
