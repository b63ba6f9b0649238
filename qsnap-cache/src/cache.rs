//! In-memory query cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use qsnap_core::constants::DEFAULT_CACHE_TIME_MS;
use qsnap_core::error::{QsnapError, Result};
use qsnap_core::traits::{CachedQuery, QueryCache};
use qsnap_core::types::{duration_to_ms, QueryConfig, QueryKey, QueryStatus};

use crate::query::Query;

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of queries; building past it fails
    pub max_queries: usize,
    /// Retention used when a query is built without one, in milliseconds
    pub default_cache_time_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_queries: 10_000,
            default_cache_time_ms: DEFAULT_CACHE_TIME_MS,
        }
    }
}

#[derive(Default)]
struct Entries {
    by_hash: HashMap<String, Arc<Query>>,
    /// Insertion order, for stable enumeration
    order: Vec<Arc<Query>>,
}

/// In-memory cache of queries.
///
/// Thread-safe. Enumeration follows insertion order. Entries are never
/// evicted on their own; `cache_time` is carried, not enforced.
pub struct MemoryQueryCache {
    entries: RwLock<Entries>,
    config: CacheConfig,
}

impl MemoryQueryCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Builds the query for `key` if needed and writes `data` into it.
    pub fn set_query_data(
        &self,
        key: impl Into<QueryKey>,
        data: Value,
        updated_at: u64,
    ) -> Result<Arc<Query>> {
        let query = self.build(&key.into(), QueryConfig::default())?;
        query.set_data(Some(data), updated_at)?;
        Ok(query)
    }

    /// Returns the value of a query, if the query exists and holds one.
    pub fn get_query_data(&self, key: &QueryKey) -> Option<Value> {
        self.find(key).and_then(|query| query.data())
    }

    /// Removes a query. Returns false if it was not cached.
    pub fn remove(&self, key: &QueryKey) -> bool {
        let mut entries = self.entries.write();
        match entries.by_hash.remove(key.query_hash()) {
            Some(removed) => {
                entries.order.retain(|query| !Arc::ptr_eq(query, &removed));
                true
            }
            None => false,
        }
    }

    /// Clears all cached queries.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.by_hash.clear();
        entries.order.clear();
    }

    /// Returns the number of cached queries.
    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().order.is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let mut stats = CacheStats {
            total_queries: entries.order.len(),
            capacity: self.config.max_queries,
            ..Default::default()
        };
        for query in &entries.order {
            let state = query.state();
            if state.has_data() {
                stats.with_data += 1;
            }
            match state.status {
                QueryStatus::Success => stats.successful += 1,
                QueryStatus::Loading => stats.loading += 1,
                QueryStatus::Error => stats.errored += 1,
                QueryStatus::Idle => {}
            }
        }
        stats
    }
}

impl Default for MemoryQueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache for MemoryQueryCache {
    type Query = Query;

    fn queries(&self) -> Vec<Arc<Query>> {
        self.entries.read().order.clone()
    }

    fn find(&self, key: &QueryKey) -> Option<Arc<Query>> {
        self.entries.read().by_hash.get(key.query_hash()).cloned()
    }

    #[instrument(skip(self, config), fields(key = %key))]
    fn build(&self, key: &QueryKey, config: QueryConfig) -> Result<Arc<Query>> {
        key.validate()?;

        let mut entries = self.entries.write();
        if let Some(existing) = entries.by_hash.get(key.query_hash()) {
            return Ok(Arc::clone(existing));
        }

        if entries.order.len() >= self.config.max_queries {
            return Err(QsnapError::CacheFull {
                capacity: self.config.max_queries,
            });
        }

        let cache_time = config
            .cache_time
            .unwrap_or_else(|| Duration::from_millis(self.config.default_cache_time_ms));
        let query = Arc::new(Query::new(key.clone(), cache_time));

        debug!(cache_time_ms = duration_to_ms(cache_time), "Building query");

        entries
            .by_hash
            .insert(key.query_hash().to_string(), Arc::clone(&query));
        entries.order.push(Arc::clone(&query));
        Ok(query)
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached queries
    pub total_queries: usize,
    /// Queries holding a value
    pub with_data: usize,
    /// Queries whose last fetch succeeded
    pub successful: usize,
    /// Queries with a fetch in flight
    pub loading: usize,
    /// Queries whose last fetch failed
    pub errored: usize,
    /// Configured maximum
    pub capacity: usize,
}
