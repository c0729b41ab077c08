//! Resolution caches.
//!
//! One segmented moka cache per lookup kind. `get_with` gives single-flight
//! computation: concurrent misses on the same key wait for the first caller's
//! result instead of walking the chain themselves. Failures are cached like
//! successes and expire with the same TTL.

use crate::config::CacheConfig;
use bulkhead_api::{CacheCounters, CacheStats, Requester, ResolveError, ResolveResult, Resolved};
use moka::sync::SegmentedCache;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything a cached answer depends on.
///
/// `index_epoch` and `revision` change whenever the export index is rebuilt or
/// the requester's deny-list changes, so stale entries are never reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub requester: Requester,
    pub index_epoch: u64,
    pub revision: u64,
    pub key: String,
}

pub type SymbolAnswer = ResolveResult<Resolved>;
pub type ResourceAnswer = ResolveResult<Arc<[Resolved]>>;

struct Table<V> {
    cache: SegmentedCache<CacheKey, V>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Table<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn new(config: &CacheConfig) -> Self {
        let cache = SegmentedCache::builder(config.concurrency_level)
            .initial_capacity(config.initial_capacity)
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl())
            .support_invalidation_closures()
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn get_with(&self, key: CacheKey, compute: impl FnOnce() -> V) -> V {
        let mut ran = false;
        let value = self.cache.get_with(key, || {
            ran = true;
            compute()
        });
        if ran {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    fn invalidate_requester(&self, requester: &Requester) {
        let requester = requester.clone();
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.requester == requester)
        {
            tracing::warn!("Failed to register cache invalidation: {:?}", e);
        }
    }

    fn counters(&self) -> CacheCounters {
        self.cache.run_pending_tasks();
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

pub struct ResolutionCache {
    symbols: Table<SymbolAnswer>,
    resources: Table<ResourceAnswer>,
}

impl ResolutionCache {
    pub fn new(symbols: &CacheConfig, resources: &CacheConfig) -> Self {
        tracing::debug!(
            "Creating resolution caches (symbols: {} entries / {} ms, resources: {} entries / {} ms)",
            symbols.max_capacity,
            symbols.ttl_ms,
            resources.max_capacity,
            resources.ttl_ms
        );
        Self {
            symbols: Table::new(symbols),
            resources: Table::new(resources),
        }
    }

    /// Cached symbol answer, computing it at most once per live key.
    pub fn get_symbol(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> ResolveResult<Resolved>,
    ) -> SymbolAnswer {
        let name = key.key.clone();
        self.symbols.get_with(key, || guarded(&name, compute))
    }

    pub fn get_resources(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Vec<Resolved>,
    ) -> ResourceAnswer {
        let path = key.key.clone();
        self.resources
            .get_with(key, || guarded(&path, || Ok(compute().into())))
    }

    /// Drop one symbol answer, e.g. after the loader recorded what it materialized.
    pub fn invalidate_symbol(&self, key: &CacheKey) {
        self.symbols.cache.invalidate(key);
    }

    /// Drop every answer computed for `requester`.
    pub fn invalidate(&self, requester: &Requester) {
        self.symbols.invalidate_requester(requester);
        self.resources.invalidate_requester(requester);
        tracing::debug!("Invalidated cached resolutions of {}", requester);
    }

    pub fn invalidate_all(&self) {
        self.symbols.cache.invalidate_all();
        self.resources.cache.invalidate_all();
        tracing::debug!("Invalidated all cached resolutions");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            symbols: self.symbols.counters(),
            resources: self.resources.counters(),
        }
    }
}

/// Run `compute`, turning a panic into a cacheable failure.
fn guarded<T>(key: &str, compute: impl FnOnce() -> ResolveResult<T>) -> ResolveResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(compute)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Resolution of '{}' panicked: {}", key, message);
            Err(ResolveError::CacheComputationFailed {
                key: key.to_string(),
                message,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkhead_api::{ConsumerId, LookupKind, ModuleRef, ProviderId, ResolutionTier};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn consumer(name: &str) -> Requester {
        Requester::Consumer(ConsumerId::new(name, "1"))
    }

    fn key(requester: &Requester, name: &str) -> CacheKey {
        CacheKey {
            requester: requester.clone(),
            index_epoch: 1,
            revision: 0,
            key: name.to_string(),
        }
    }

    fn hit() -> ResolveResult<Resolved> {
        Ok(Resolved::provider(
            ProviderId::new("p"),
            ResolutionTier::ExportIndex,
        ))
    }

    #[test]
    fn test_concurrent_misses_compute_once() {
        let cache = Arc::new(ResolutionCache::new(
            &CacheConfig::symbols(),
            &CacheConfig::resources(),
        ));
        let computations = Arc::new(AtomicU64::new(0));
        let barrier = Arc::new(Barrier::new(8));
        let requester = consumer("biz");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let computations = computations.clone();
                let barrier = barrier.clone();
                let requester = requester.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_symbol(key(&requester, "a.B"), || {
                        computations.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        hit()
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), hit());
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);

        let stats = cache.stats().symbols;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_failures_are_cached() {
        let cache = ResolutionCache::new(&CacheConfig::symbols(), &CacheConfig::resources());
        let requester = consumer("biz");
        let computations = AtomicU64::new(0);
        let miss = || {
            computations.fetch_add(1, Ordering::SeqCst);
            Err(ResolveError::not_found(LookupKind::Symbol, "x.Y", "biz"))
        };

        assert!(cache.get_symbol(key(&requester, "x.Y"), miss).is_err());
        assert!(cache.get_symbol(key(&requester, "x.Y"), miss).is_err());
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let short = CacheConfig {
            ttl_ms: 50,
            ..CacheConfig::symbols()
        };
        let cache = ResolutionCache::new(&short, &short);
        let requester = consumer("biz");
        let computations = AtomicU64::new(0);
        let compute = || {
            computations.fetch_add(1, Ordering::SeqCst);
            hit()
        };

        cache.get_symbol(key(&requester, "a.B"), compute).unwrap();
        cache.get_symbol(key(&requester, "a.B"), compute).unwrap();
        assert_eq!(computations.load(Ordering::SeqCst), 1);

        thread::sleep(Duration::from_millis(200));
        cache.get_symbol(key(&requester, "a.B"), compute).unwrap();
        assert_eq!(computations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resource_entries_expire_after_ttl() {
        let short = CacheConfig {
            ttl_ms: 50,
            ..CacheConfig::resources()
        };
        let cache = ResolutionCache::new(&CacheConfig::symbols(), &short);
        let requester = consumer("biz");
        let computations = AtomicU64::new(0);
        let compute = || {
            computations.fetch_add(1, Ordering::SeqCst);
            vec![Resolved::new(ModuleRef::Runtime, ResolutionTier::Runtime)]
        };

        cache.get_resources(key(&requester, "app.xml"), compute).unwrap();
        cache.get_resources(key(&requester, "app.xml"), compute).unwrap();
        assert_eq!(computations.load(Ordering::SeqCst), 1);

        thread::sleep(Duration::from_millis(200));
        let answer = cache.get_resources(key(&requester, "app.xml"), compute).unwrap();
        assert_eq!(answer.len(), 1);
        assert_eq!(computations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_becomes_cached_failure() {
        let cache = ResolutionCache::new(&CacheConfig::symbols(), &CacheConfig::resources());
        let requester = consumer("biz");

        let answer = cache.get_symbol(key(&requester, "boom.X"), || panic!("store exploded"));
        assert_eq!(
            answer,
            Err(ResolveError::CacheComputationFailed {
                key: "boom.X".to_string(),
                message: "store exploded".to_string(),
            })
        );
        // Served from the cache, the closure is not called again
        let again = cache.get_symbol(key(&requester, "boom.X"), hit);
        assert!(again.is_err());
    }

    #[test]
    fn test_invalidate_only_touches_requester() {
        let cache = ResolutionCache::new(&CacheConfig::symbols(), &CacheConfig::resources());
        let biz = consumer("biz");
        let other = consumer("other");
        let computations = AtomicU64::new(0);
        let compute = || {
            computations.fetch_add(1, Ordering::SeqCst);
            hit()
        };

        cache.get_symbol(key(&biz, "a.B"), compute).unwrap();
        cache.get_symbol(key(&other, "a.B"), compute).unwrap();
        assert_eq!(computations.load(Ordering::SeqCst), 2);

        cache.invalidate(&biz);
        cache.get_symbol(key(&biz, "a.B"), compute).unwrap();
        cache.get_symbol(key(&other, "a.B"), compute).unwrap();
        assert_eq!(computations.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_resource_lists_keep_order() {
        let cache = ResolutionCache::new(&CacheConfig::symbols(), &CacheConfig::resources());
        let requester = consumer("biz");
        let answer = cache
            .get_resources(key(&requester, "multi.xml"), || {
                vec![
                    Resolved::provider(ProviderId::new("B"), ResolutionTier::ExportIndex),
                    Resolved::new(ModuleRef::Runtime, ResolutionTier::Runtime),
                ]
            })
            .unwrap();
        assert_eq!(answer.len(), 2);
        assert_eq!(answer[1].module, ModuleRef::Runtime);

        let cached = cache
            .get_resources(key(&requester, "multi.xml"), Vec::new)
            .unwrap();
        assert_eq!(cached, answer);
    }
}
