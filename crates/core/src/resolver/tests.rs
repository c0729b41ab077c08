use super::*;
use bulkhead_api::{ConsumerId, ConsumerSpec, InMemoryStore, ProviderSpec, RuleSpec};

struct Fixture {
    registry: Arc<Registry>,
    hosts: HostStores,
    mode: DenyMode,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            hosts: HostStores::default(),
            mode: DenyMode::Strict,
        }
    }

    fn provider(&self, spec: ProviderSpec, store: InMemoryStore) -> Arc<ProviderRecord> {
        self.registry
            .register_provider(&spec, Arc::new(store))
            .unwrap()
    }

    fn consumer(&self, spec: ConsumerSpec, store: InMemoryStore) -> Arc<ConsumerRecord> {
        self.registry
            .register_consumer(&spec, Arc::new(store))
            .unwrap()
    }

    fn index(&self) -> ExportIndex {
        let providers = self.registry.providers_by_priority();
        ExportIndex::build(1, providers.iter().map(|p| p.as_ref()))
    }

    fn resolver(&self) -> Resolver {
        let framework = SymbolRules::namespaces(&["bulkhead.spi.*".to_string()]).unwrap();
        Resolver::new(
            self.registry.clone(),
            self.hosts.clone(),
            framework,
            self.mode,
        )
    }
}

fn symbols(names: &[&str]) -> InMemoryStore {
    InMemoryStore::new().with_symbols(names.iter().copied())
}

fn resources(paths: &[&str]) -> InMemoryStore {
    InMemoryStore::new().with_resources(paths.iter().copied())
}

#[test]
fn test_export_index_beats_local_copy() {
    let fx = Fixture::new();
    fx.provider(
        ProviderSpec::new("rpc", "1").with_exports(RuleSpec::new().namespace("com.rpc.*")),
        symbols(&["com.rpc.Client"]),
    );
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), symbols(&["com.rpc.Client"]));

    let resolved = fx
        .resolver()
        .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "com.rpc.Client")
        .unwrap();
    assert_eq!(resolved, Resolved::provider("rpc".into(), ResolutionTier::ExportIndex));
}

#[test]
fn test_runtime_tier_wins_over_exports() {
    let mut fx = Fixture::new();
    fx.hosts.runtime = Arc::new(symbols(&["core.String"]));
    fx.provider(
        ProviderSpec::new("shadow", "1").with_exports(RuleSpec::new().symbol("core.String")),
        InMemoryStore::new(),
    );
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), InMemoryStore::new());

    let resolved = fx
        .resolver()
        .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "core.String")
        .unwrap();
    assert_eq!(resolved, Resolved::new(ModuleRef::Runtime, ResolutionTier::Runtime));
}

#[test]
fn test_framework_tier_needs_reserved_namespace() {
    let mut fx = Fixture::new();
    fx.hosts.framework = Arc::new(symbols(&["bulkhead.spi.Plugin", "other.Thing"]));
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), InMemoryStore::new());
    let resolver = fx.resolver();
    let index = fx.index();

    assert_eq!(
        resolver
            .resolve_symbol(&index, Subject::Consumer(&biz), "bulkhead.spi.Plugin")
            .unwrap()
            .tier,
        ResolutionTier::Framework
    );
    // Present in the framework store but outside its namespaces
    assert!(
        resolver
            .resolve_symbol(&index, Subject::Consumer(&biz), "other.Thing")
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn test_loaded_tier_short_circuits() {
    let fx = Fixture::new();
    fx.provider(
        ProviderSpec::new("rpc", "1").with_exports(RuleSpec::new().symbol("a.B")),
        InMemoryStore::new(),
    );
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), symbols(&["a.B"]));
    biz.record_loaded(
        "a.B",
        Resolved::new(ModuleRef::Consumer(biz.id.clone()), ResolutionTier::Local),
    );

    let resolved = fx
        .resolver()
        .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "a.B")
        .unwrap();
    assert_eq!(
        resolved,
        Resolved::new(ModuleRef::Consumer(biz.id.clone()), ResolutionTier::Loaded)
    );
}

#[test]
fn test_deny_stem_falls_through_to_local() {
    let fx = Fixture::new();
    fx.provider(
        ProviderSpec::new("p", "1").with_exports(RuleSpec::new().symbol("a.b.c.D")),
        InMemoryStore::new(),
    );
    let biz = fx.consumer(
        ConsumerSpec::new("biz", "1").with_deny(RuleSpec::new().namespace("a.b.*")),
        symbols(&["a.b.c.D"]),
    );

    let resolved = fx
        .resolver()
        .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "a.b.c.D")
        .unwrap();
    assert_eq!(
        resolved,
        Resolved::new(ModuleRef::Consumer(biz.id.clone()), ResolutionTier::Local)
    );
}

#[test]
fn test_denied_without_fallback_reports_policy() {
    let fx = Fixture::new();
    fx.provider(
        ProviderSpec::new("p", "1").with_exports(RuleSpec::new().namespace("a.b")),
        InMemoryStore::new(),
    );
    let biz = fx.consumer(
        ConsumerSpec::new("biz", "1").with_deny(RuleSpec::new().symbol("a.b.Secret")),
        InMemoryStore::new(),
    );
    let resolver = fx.resolver();
    let index = fx.index();

    let err = resolver
        .resolve_symbol(&index, Subject::Consumer(&biz), "a.b.Secret")
        .unwrap_err();
    assert!(matches!(err, ResolveError::DeniedByPolicy { .. }));
    assert!(matches!(err.surface(), ResolveError::NotFound { .. }));

    let err = resolver
        .resolve_symbol(&index, Subject::Consumer(&biz), "z.Missing")
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn test_permissive_mode_allows_denied_export() {
    let mut fx = Fixture::new();
    fx.mode = DenyMode::Permissive;
    fx.provider(
        ProviderSpec::new("p", "1").with_exports(RuleSpec::new().symbol("a.Secret")),
        InMemoryStore::new(),
    );
    let biz = fx.consumer(
        ConsumerSpec::new("biz", "1").with_deny(RuleSpec::new().symbol("a.Secret")),
        InMemoryStore::new(),
    );

    let resolved = fx
        .resolver()
        .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "a.Secret")
        .unwrap();
    assert_eq!(resolved.tier, ResolutionTier::ExportIndex);
}

#[test]
fn test_delegate_after_local() {
    let fx = Fixture::new();
    let master = fx.consumer(ConsumerSpec::new("master", "1"), symbols(&["m.Shared"]));
    let biz = fx.consumer(
        ConsumerSpec::new("biz", "1").with_delegate(master.id.clone()),
        InMemoryStore::new(),
    );

    let resolved = fx
        .resolver()
        .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "m.Shared")
        .unwrap();
    assert_eq!(
        resolved,
        Resolved::new(ModuleRef::Consumer(master.id.clone()), ResolutionTier::Delegate)
    );
}

#[test]
fn test_missing_delegate_is_skipped() {
    let fx = Fixture::new();
    let biz = fx.consumer(
        ConsumerSpec::new("biz", "1").with_delegate(ConsumerId::new("ghost", "1")),
        InMemoryStore::new(),
    );

    assert!(
        fx.resolver()
            .resolve_symbol(&fx.index(), Subject::Consumer(&biz), "m.Shared")
            .is_err()
    );
}

#[test]
fn test_agent_then_system() {
    let mut fx = Fixture::new();
    fx.hosts.agent = Arc::new(symbols(&["agent.Probe"]));
    fx.hosts.system = Arc::new(symbols(&["agent.Probe", "sys.Thread"]));
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), InMemoryStore::new());
    let resolver = fx.resolver();
    let index = fx.index();

    assert_eq!(
        resolver
            .resolve_symbol(&index, Subject::Consumer(&biz), "agent.Probe")
            .unwrap()
            .tier,
        ResolutionTier::Agent
    );
    assert_eq!(
        resolver
            .resolve_symbol(&index, Subject::Consumer(&biz), "sys.Thread")
            .unwrap()
            .tier,
        ResolutionTier::System
    );
}

#[test]
fn test_provider_reaches_exports_through_imports_only() {
    let fx = Fixture::new();
    fx.provider(
        ProviderSpec::new("log", "1").with_exports(RuleSpec::new().namespace("org.log.*")),
        symbols(&["org.log.Logger"]),
    );
    let rpc = fx.provider(
        ProviderSpec::new("rpc", "1").with_imports(RuleSpec::new().namespace("org.log")),
        symbols(&["com.rpc.Client"]),
    );
    let resolver = fx.resolver();
    let index = fx.index();

    assert_eq!(
        resolver
            .resolve_symbol(&index, Subject::Provider(&rpc), "org.log.Logger")
            .unwrap(),
        Resolved::provider("log".into(), ResolutionTier::Import)
    );
    assert_eq!(
        resolver
            .resolve_symbol(&index, Subject::Provider(&rpc), "com.rpc.Client")
            .unwrap(),
        Resolved::provider("rpc".into(), ResolutionTier::Local)
    );
    // Exported but not imported
    assert!(
        resolver
            .resolve_symbol(&index, Subject::Provider(&rpc), "org.log.impl.Appender")
            .is_err()
    );
}

#[test]
fn test_resource_hits_follow_chain_order() {
    let mut fx = Fixture::new();
    fx.hosts.runtime = Arc::new(resources(&["multi.xml"]));
    fx.hosts.agent = Arc::new(resources(&["multi.xml"]));
    for (name, priority) in [("A", 100), ("B", 1)] {
        fx.provider(
            ProviderSpec::new(name, "1")
                .with_priority(priority)
                .with_exports(RuleSpec::new().resource("multi.xml")),
            InMemoryStore::new(),
        );
    }
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), resources(&["multi.xml"]));

    let hits = fx
        .resolver()
        .resolve_resource(&fx.index(), Subject::Consumer(&biz), "multi.xml");
    let modules: Vec<_> = hits.iter().map(|r| r.module.to_string()).collect();
    assert_eq!(
        modules,
        vec![
            "provider:B",
            "provider:A",
            "consumer:biz:1",
            "runtime",
            "agent"
        ]
    );
}

#[test]
fn test_denied_resource_skips_exports_only() {
    let fx = Fixture::new();
    fx.provider(
        ProviderSpec::new("conf", "1").with_exports(RuleSpec::new().resource("conf/*")),
        InMemoryStore::new(),
    );
    let biz = fx.consumer(
        ConsumerSpec::new("biz", "1").with_deny(RuleSpec::new().resource("conf/app.xml")),
        resources(&["conf/app.xml"]),
    );
    let resolver = fx.resolver();
    let index = fx.index();

    let hits = resolver.resolve_resource(&index, Subject::Consumer(&biz), "conf/app.xml");
    assert_eq!(
        hits,
        vec![Resolved::new(
            ModuleRef::Consumer(biz.id.clone()),
            ResolutionTier::Local
        )]
    );

    let hits = resolver.resolve_resource(&index, Subject::Consumer(&biz), "conf/db.xml");
    assert_eq!(
        hits,
        vec![Resolved::provider("conf".into(), ResolutionTier::ExportIndex)]
    );
}

#[test]
fn test_unmatched_resource_is_empty() {
    let fx = Fixture::new();
    let biz = fx.consumer(ConsumerSpec::new("biz", "1"), InMemoryStore::new());
    assert!(
        fx.resolver()
            .resolve_resource(&fx.index(), Subject::Consumer(&biz), "nothing.txt")
            .is_empty()
    );
}
