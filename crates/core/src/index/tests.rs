use super::*;
use crate::registry::Registry;
use bulkhead_api::{EmptyStore, ProviderSpec, RuleSpec};
use std::sync::Arc;

fn register(registry: &Registry, name: &str, priority: i32, exports: RuleSpec) {
    let spec = ProviderSpec::new(name, "1.0")
        .with_priority(priority)
        .with_exports(exports);
    registry
        .register_provider(&spec, Arc::new(EmptyStore))
        .unwrap();
}

fn build(registry: &Registry) -> ExportIndex {
    let providers = registry.providers_by_priority();
    ExportIndex::build(1, providers.iter().map(|p| p.as_ref()))
}

fn names(providers: Option<&[ProviderId]>) -> Vec<&str> {
    providers
        .unwrap_or_default()
        .iter()
        .map(|p| p.as_str())
        .collect()
}

#[test]
fn test_lower_priority_value_claims_symbol() {
    let registry = Registry::new();
    // Registered out of priority order on purpose
    register(&registry, "p2", 2, RuleSpec::new().symbol("X"));
    register(&registry, "p1", 1, RuleSpec::new().symbol("X"));

    let index = build(&registry);
    assert_eq!(index.find_symbol("X").map(|p| p.as_str()), Some("p1"));
}

#[test]
fn test_namespace_walk() {
    let registry = Registry::new();
    register(&registry, "nodes", 1, RuleSpec::new().namespace("a.b.c"));
    register(&registry, "stems", 2, RuleSpec::new().namespace("a.b.*"));

    let index = build(&registry);

    // Node at the full namespace
    assert_eq!(
        index.find_symbol("a.b.c.D").map(|p| p.as_str()),
        Some("nodes")
    );
    // Below the node: the node no longer applies, the stem does
    assert_eq!(
        index.find_symbol("a.b.c.d.E").map(|p| p.as_str()),
        Some("stems")
    );
    assert_eq!(
        index.find_symbol("a.b.F").map(|p| p.as_str()),
        Some("stems")
    );
    assert_eq!(index.find_symbol("a.G"), None);
    assert_eq!(index.find_symbol("Top"), None);
}

#[test]
fn test_node_beats_stem_at_same_depth() {
    let registry = Registry::new();
    register(&registry, "stem-first", 1, RuleSpec::new().namespace("a.b.*"));
    register(&registry, "node-second", 2, RuleSpec::new().namespace("a.b"));

    let index = build(&registry);
    assert_eq!(
        index.find_symbol("a.b.C").map(|p| p.as_str()),
        Some("node-second")
    );
}

#[test]
fn test_exact_symbol_beats_namespace() {
    let registry = Registry::new();
    register(&registry, "ns", 1, RuleSpec::new().namespace("a.b.*"));
    register(&registry, "exact", 2, RuleSpec::new().symbol("a.b.C"));

    let index = build(&registry);
    assert_eq!(
        index.find_symbol("a.b.C").map(|p| p.as_str()),
        Some("exact")
    );
    assert_eq!(index.find_symbol("a.b.D").map(|p| p.as_str()), Some("ns"));
}

#[test]
fn test_multi_provider_resource_order() {
    let registry = Registry::new();
    register(&registry, "A", 100, RuleSpec::new().resource("multi.xml"));
    register(&registry, "B", 1, RuleSpec::new().resource("multi.xml"));
    register(&registry, "C", 1000, RuleSpec::new().resource("multi.xml"));

    let index = build(&registry);
    assert_eq!(names(index.find_resource("multi.xml")), vec!["B", "A", "C"]);
}

#[test]
fn test_resource_stems() {
    let registry = Registry::new();
    register(
        &registry,
        "A",
        1,
        RuleSpec::new().resource("export/folderA/*").resource("*.xsd"),
    );

    let index = build(&registry);
    assert_eq!(names(index.find_resource("export/folderA/test1.xml")), vec!["A"]);
    assert_eq!(names(index.find_resource("report.xsd")), vec!["A"]);
    assert!(index.find_resource("export/folderB/test.xml").is_none());
}

#[test]
fn test_exact_resource_beats_stems() {
    let registry = Registry::new();
    register(&registry, "stem", 1, RuleSpec::new().resource("conf/*"));
    register(&registry, "exact", 2, RuleSpec::new().resource("conf/app.xml"));

    let index = build(&registry);
    assert_eq!(names(index.find_resource("conf/app.xml")), vec!["exact"]);
    assert_eq!(names(index.find_resource("conf/other.xml")), vec!["stem"]);
}

#[test]
fn test_first_prefix_stem_in_insertion_order() {
    let registry = Registry::new();
    register(&registry, "broad", 1, RuleSpec::new().resource("export/*"));
    register(&registry, "narrow", 2, RuleSpec::new().resource("export/folderA/*"));

    let index = build(&registry);
    assert_eq!(names(index.find_resource("export/folderA/x.xml")), vec!["broad"]);
}

#[test]
fn test_extend_never_overrides_existing_claims() {
    let registry = Registry::new();
    register(&registry, "late-but-strong", 5, RuleSpec::new().symbol("X"));

    let mut index = build(&registry);
    register(&registry, "strongest", 0, RuleSpec::new().symbol("X").symbol("Y"));

    let providers = registry.providers_by_priority();
    let added = index.extend(providers.iter().map(|p| p.as_ref()));
    assert_eq!(added, 1);
    assert_eq!(
        index.find_symbol("X").map(|p| p.as_str()),
        Some("late-but-strong")
    );
    assert_eq!(index.find_symbol("Y").map(|p| p.as_str()), Some("strongest"));

    // Re-running is a no-op
    let providers = registry.providers_by_priority();
    assert_eq!(index.extend(providers.iter().map(|p| p.as_ref())), 0);
    assert_eq!(index.stats().providers, 2);
}

#[test]
fn test_rebuild_is_idempotent() {
    let registry = Registry::new();
    register(
        &registry,
        "A",
        1,
        RuleSpec::new()
            .symbol("a.B")
            .namespace("a.c")
            .namespace("a.d.*")
            .resource("x.xml")
            .resource("dir/*")
            .resource("*.txt"),
    );

    let first = build(&registry).stats();
    let second = build(&registry).stats();
    assert_eq!(first, second);
    assert_eq!(
        first,
        IndexStats {
            epoch: 1,
            providers: 1,
            symbols: 1,
            namespace_nodes: 1,
            namespace_stems: 1,
            resources: 1,
            resource_prefixes: 1,
            resource_suffixes: 1,
        }
    );
}
