//! Snapshot production.

use tracing::{debug, instrument};

use qsnap_core::traits::{CachedQuery, QueryCache};
use qsnap_core::types::{duration_to_ms, HydrationConfig, RecordOverrides, Snapshot, SnapshotRecord};

/// Predicate deciding whether a query is worth transferring.
pub type ShouldDehydrate = Box<dyn Fn(&dyn CachedQuery) -> bool + Send + Sync>;

/// Default predicate: only queries whose last fetch succeeded.
///
/// Loading, failed and idle queries carry nothing the other side can use.
pub fn default_should_dehydrate(query: &dyn CachedQuery) -> bool {
    query.state().status.is_success()
}

/// Options for [`dehydrate`].
pub struct DehydrateOptions {
    /// Defaults agreed with the consuming side
    pub config: HydrationConfig,
    should_dehydrate: Option<ShouldDehydrate>,
}

impl DehydrateOptions {
    /// Creates options with the default predicate.
    pub fn new(config: HydrationConfig) -> Self {
        Self {
            config,
            should_dehydrate: None,
        }
    }

    /// Replaces the predicate.
    pub fn should_dehydrate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn CachedQuery) -> bool + Send + Sync + 'static,
    {
        self.should_dehydrate = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, query: &dyn CachedQuery) -> bool {
        match &self.should_dehydrate {
            Some(predicate) => predicate(query),
            None => default_should_dehydrate(query),
        }
    }
}

impl Default for DehydrateOptions {
    fn default() -> Self {
        Self::new(HydrationConfig::default())
    }
}

impl std::fmt::Debug for DehydrateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DehydrateOptions")
            .field("config", &self.config)
            .field("custom_predicate", &self.should_dehydrate.is_some())
            .finish()
    }
}

/// Projects one query into a record.
///
/// `data` is set only if the query holds a value, and the retention override
/// only if it differs from `config`'s default.
pub fn dehydrate_query(query: &dyn CachedQuery, config: &HydrationConfig) -> SnapshotRecord {
    let state = query.state();

    let cache_time_ms = duration_to_ms(query.cache_time());
    let overrides = RecordOverrides {
        cache_time_ms: (cache_time_ms != config.default_cache_time_ms).then_some(cache_time_ms),
    };

    SnapshotRecord {
        key: query.query_key().clone(),
        data: state.data,
        updated_at: state.updated_at,
        overrides,
    }
}

/// Builds a snapshot of every query in `cache` accepted by the options'
/// predicate, in enumeration order. The cache is not modified.
#[instrument(skip_all)]
pub fn dehydrate<C>(cache: &C, options: &DehydrateOptions) -> Snapshot
where
    C: QueryCache + ?Sized,
{
    let queries = cache.queries();
    let mut records = Vec::with_capacity(queries.len());

    for query in &queries {
        let query: &dyn CachedQuery = &**query;
        if options.accepts(query) {
            records.push(dehydrate_query(query, &options.config));
        }
    }

    debug!(
        total = queries.len(),
        dehydrated = records.len(),
        "Dehydrated cache"
    );
    Snapshot::new(records)
}

/// Builds a snapshot with a one-off predicate.
pub fn dehydrate_with<C, F>(cache: &C, config: &HydrationConfig, predicate: F) -> Snapshot
where
    C: QueryCache + ?Sized,
    F: Fn(&dyn CachedQuery) -> bool + Send + Sync + 'static,
{
    let options = DehydrateOptions::new(config.clone()).should_dehydrate(predicate);
    dehydrate(cache, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use qsnap_cache::MemoryQueryCache;
    use qsnap_core::types::{QueryConfig, QueryKey, QueryStatus};
    use serde_json::{json, Value};

    #[test]
    fn test_empty_cache_yields_empty_snapshot() {
        let cache = MemoryQueryCache::new();
        let snapshot = dehydrate(&cache, &DehydrateOptions::default());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_default_predicate_skips_unsettled_queries() {
        let cache = MemoryQueryCache::new();
        cache.set_query_data("done", json!(1), 10).unwrap();
        cache
            .build(&QueryKey::from("pending"), QueryConfig::default())
            .unwrap()
            .fetch_started();
        let failed = cache.set_query_data("failed", json!(2), 5).unwrap();
        failed.fetch_failed("boom");

        let snapshot = dehydrate(&cache, &DehydrateOptions::default());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.records[0].key, QueryKey::from("done"));
    }

    #[test]
    fn test_custom_predicate() {
        let cache = MemoryQueryCache::new();
        cache.set_query_data("a", json!(1), 1).unwrap();
        cache
            .build(&QueryKey::from("b"), QueryConfig::default())
            .unwrap()
            .fetch_started();

        let snapshot = dehydrate_with(&cache, &HydrationConfig::default(), |_| true);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records[1].data, None);
        assert_eq!(snapshot.records[1].updated_at, 0);

        let none = dehydrate_with(&cache, &HydrationConfig::default(), |_| false);
        assert!(none.is_empty());

        let loading_only = dehydrate_with(&cache, &HydrationConfig::default(), |query| {
            query.state().status == QueryStatus::Loading
        });
        assert_eq!(loading_only.records[0].key, QueryKey::from("b"));
    }

    #[test]
    fn test_record_fields() {
        let cache = MemoryQueryCache::new();
        cache.set_query_data("a", Value::Null, 42).unwrap();
        let query = cache
            .build(&QueryKey::from("b"), QueryConfig::with_cache_time(Duration::from_secs(1)))
            .unwrap();
        query.set_data(Some(json!({"n": 1})), 7).unwrap();

        let snapshot = dehydrate(&cache, &DehydrateOptions::default());
        let a = &snapshot.records[0];
        assert_eq!(a.data, Some(Value::Null));
        assert_eq!(a.updated_at, 42);
        assert!(a.overrides.is_empty());

        let b = &snapshot.records[1];
        assert_eq!(b.overrides.cache_time_ms, Some(1000));
    }

    #[test]
    fn test_override_is_relative_to_configured_default() {
        let cache = MemoryQueryCache::new();
        cache
            .build(&QueryKey::from("a"), QueryConfig::with_cache_time(Duration::from_secs(60)))
            .unwrap()
            .set_data(Some(json!(1)), 1)
            .unwrap();

        let config = HydrationConfig::with_default_cache_time(Duration::from_secs(60));
        let snapshot = dehydrate(&cache, &DehydrateOptions::new(config));
        assert!(snapshot.records[0].overrides.is_empty());

        let snapshot = dehydrate(&cache, &DehydrateOptions::default());
        assert_eq!(snapshot.records[0].overrides.cache_time_ms, Some(60_000));
    }

    #[test]
    fn test_dehydrate_does_not_touch_cache() {
        let cache = MemoryQueryCache::new();
        cache.set_query_data("a", json!(1), 1).unwrap();
        let before = cache.stats();
        let first = dehydrate(&cache, &DehydrateOptions::default());
        let second = dehydrate(&cache, &DehydrateOptions::default());
        assert_eq!(first, second);
        assert_eq!(cache.stats(), before);
    }
}
