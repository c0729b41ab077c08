//! Declarative module descriptions handed over by the deployment collaborator.
//!
//! Patterns are kept as written; classification into exact entries, namespace
//! nodes and stems happens when a module is registered.
//!
//! | list | pattern | meaning |
//! |------|---------|---------|
//! | `namespaces` | `a.b` | symbols whose namespace is exactly `a.b` |
//! | `namespaces` | `a.b.*` | symbols in `a.b` or any namespace below it |
//! | `resources` | `export/folderA/*` | paths starting with `export/folderA/` |
//! | `resources` | `*.xsd` | paths ending with `.xsd` |

use super::identity::{ConsumerId, ProviderId};
use serde::{Deserialize, Serialize};

/// A set of symbol and resource patterns. Used for exports, imports and deny-lists alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSpec {
    pub symbols: Vec<String>,
    pub namespaces: Vec<String>,
    pub resources: Vec<String>,
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from manifest-style comma separated lists.
    pub fn from_manifest(symbols: &str, namespaces: &str, resources: &str) -> Self {
        fn split(list: &str) -> Vec<String> {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        }

        Self {
            symbols: split(symbols),
            namespaces: split(namespaces),
            resources: split(resources),
        }
    }

    pub fn symbol(mut self, name: impl Into<String>) -> Self {
        self.symbols.push(name.into());
        self
    }

    pub fn namespace(mut self, pattern: impl Into<String>) -> Self {
        self.namespaces.push(pattern.into());
        self
    }

    pub fn resource(mut self, pattern: impl Into<String>) -> Self {
        self.resources.push(pattern.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.namespaces.is_empty() && self.resources.is_empty()
    }
}

pub type ExportSpec = RuleSpec;
pub type ImportSpec = RuleSpec;
pub type DenySpec = RuleSpec;

/// Seed contents for an in-memory module store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreContents {
    pub symbols: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub version: String,
    /// Lower value wins.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub exports: ExportSpec,
    #[serde(default)]
    pub imports: ImportSpec,
    #[serde(default)]
    pub contents: StoreContents,
}

fn default_priority() -> i32 {
    1000
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            priority: default_priority(),
            exports: ExportSpec::default(),
            imports: ImportSpec::default(),
            contents: StoreContents::default(),
        }
    }

    pub fn id(&self) -> ProviderId {
        ProviderId::new(self.name.clone())
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_exports(mut self, exports: ExportSpec) -> Self {
        self.exports = exports;
        self
    }

    pub fn with_imports(mut self, imports: ImportSpec) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_contents(mut self, contents: StoreContents) -> Self {
        self.contents = contents;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub deny: DenySpec,
    /// Master consumer whose own store is searched after this consumer's.
    #[serde(default)]
    pub delegate: Option<ConsumerId>,
    #[serde(default)]
    pub contents: StoreContents,
}

impl ConsumerSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            deny: DenySpec::default(),
            delegate: None,
            contents: StoreContents::default(),
        }
    }

    pub fn id(&self) -> ConsumerId {
        ConsumerId::new(&self.name, &self.version)
    }

    pub fn with_deny(mut self, deny: DenySpec) -> Self {
        self.deny = deny;
        self
    }

    pub fn with_delegate(mut self, delegate: ConsumerId) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn with_contents(mut self, contents: StoreContents) -> Self {
        self.contents = contents;
        self
    }
}

/// Everything registered for one deployment epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deployment {
    pub providers: Vec<ProviderSpec>,
    pub consumers: Vec<ConsumerSpec>,
}

impl Deployment {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
