//! Visibility rules: classification of export/import/deny patterns and matching.
//!
//! Symbols are dot separated (`com.acme.api.Client`); the namespace of a symbol is
//! everything before the last dot. A namespace stem `a.b` covers `a.b` and any
//! namespace below it, but not `a.bc`.

use bulkhead_api::{ResolveError, ResolveResult, RuleSpec};
use indexmap::IndexSet;
use std::fmt;

/// Namespace of a symbol; the empty string is the root namespace.
pub fn namespace_of(symbol: &str) -> &str {
    symbol.rfind('.').map_or("", |i| &symbol[..i])
}

/// One segment up, or `None` when `namespace` is already top-level.
pub fn parent_namespace(namespace: &str) -> Option<&str> {
    namespace.rfind('.').map(|i| &namespace[..i])
}

/// Segment-aware prefix test.
pub fn within_stem(namespace: &str, stem: &str) -> bool {
    namespace
        .strip_prefix(stem)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch {
    Exact,
    Node,
    Stem,
    Prefix,
    Suffix,
}

impl fmt::Display for RuleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleMatch::Exact => "exact",
            RuleMatch::Node => "namespace-node",
            RuleMatch::Stem => "namespace-stem",
            RuleMatch::Prefix => "prefix-stem",
            RuleMatch::Suffix => "suffix-stem",
        };
        f.write_str(s)
    }
}

fn invalid(pattern: &str, reason: &'static str) -> ResolveError {
    ResolveError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    }
}

/// Exact symbols, namespace nodes and namespace stems, each in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolRules {
    symbols: IndexSet<String>,
    nodes: IndexSet<String>,
    stems: IndexSet<String>,
}

impl SymbolRules {
    pub fn compile(symbols: &[String], namespaces: &[String]) -> ResolveResult<Self> {
        let mut rules = SymbolRules::default();

        for raw in symbols {
            let symbol = raw.trim();
            if symbol.is_empty() {
                continue;
            }
            if symbol.contains('*') {
                return Err(invalid(symbol, "symbol entries cannot contain wildcards"));
            }
            rules.symbols.insert(symbol.to_string());
        }

        for raw in namespaces {
            let pattern = raw.trim();
            if pattern.is_empty() {
                continue;
            }
            match pattern.strip_suffix(".*") {
                Some(stem) if !stem.is_empty() && !stem.contains('*') => {
                    rules.stems.insert(stem.to_string());
                }
                Some(_) => return Err(invalid(pattern, "wildcard must follow a namespace")),
                None if pattern.contains('*') => {
                    return Err(invalid(pattern, "only a trailing '.*' wildcard is supported"));
                }
                None => {
                    rules.nodes.insert(pattern.to_string());
                }
            }
        }

        Ok(rules)
    }

    /// Namespace patterns only, e.g. the framework's reserved namespaces.
    pub fn namespaces(patterns: &[String]) -> ResolveResult<Self> {
        Self::compile(&[], patterns)
    }

    pub fn find_match(&self, symbol: &str) -> Option<RuleMatch> {
        if self.symbols.contains(symbol) {
            return Some(RuleMatch::Exact);
        }
        let namespace = namespace_of(symbol);
        if self.nodes.contains(namespace) {
            return Some(RuleMatch::Node);
        }
        if self.stems.iter().any(|stem| within_stem(namespace, stem)) {
            return Some(RuleMatch::Stem);
        }
        None
    }

    pub fn matches(&self, symbol: &str) -> bool {
        self.find_match(symbol).is_some()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn stems(&self) -> impl Iterator<Item = &str> {
        self.stems.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.nodes.is_empty() && self.stems.is_empty()
    }
}

/// Exact paths, prefix stems (`dir/*`) and suffix stems (`*.ext`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRules {
    exact: IndexSet<String>,
    prefixes: IndexSet<String>,
    suffixes: IndexSet<String>,
}

impl ResourceRules {
    pub fn compile(patterns: &[String]) -> ResolveResult<Self> {
        let mut rules = ResourceRules::default();

        for raw in patterns {
            let pattern = raw.trim();
            if pattern.is_empty() {
                continue;
            }
            if pattern == "*" {
                return Err(invalid(pattern, "a lone wildcard would match every resource"));
            }
            let wildcards = pattern.matches('*').count();
            if wildcards > 1 {
                return Err(invalid(pattern, "at most one wildcard is supported"));
            }
            if let Some(prefix) = pattern.strip_suffix('*') {
                rules.prefixes.insert(prefix.to_string());
            } else if let Some(suffix) = pattern.strip_prefix('*') {
                rules.suffixes.insert(suffix.to_string());
            } else if wildcards == 1 {
                return Err(invalid(pattern, "wildcard must lead or trail the pattern"));
            } else {
                rules.exact.insert(pattern.to_string());
            }
        }

        Ok(rules)
    }

    pub fn find_match(&self, path: &str) -> Option<RuleMatch> {
        if self.exact.contains(path) {
            return Some(RuleMatch::Exact);
        }
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return Some(RuleMatch::Prefix);
        }
        if self.suffixes.iter().any(|s| path.ends_with(s.as_str())) {
            return Some(RuleMatch::Suffix);
        }
        None
    }

    pub fn matches(&self, path: &str) -> bool {
        self.find_match(path).is_some()
    }

    pub fn exact(&self) -> impl Iterator<Item = &str> {
        self.exact.iter().map(String::as_str)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty() && self.suffixes.is_empty()
    }
}

/// Compiled form of a [`RuleSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRules {
    pub symbols: SymbolRules,
    pub resources: ResourceRules,
}

impl ModuleRules {
    pub fn compile(spec: &RuleSpec) -> ResolveResult<Self> {
        Ok(Self {
            symbols: SymbolRules::compile(&spec.symbols, &spec.namespaces)?,
            resources: ResourceRules::compile(&spec.resources)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.resources.is_empty()
    }
}
