//! Cache interface required by dehydration and hydration.
//!
//! qsnap does not own a cache. Any store that can enumerate, look up and
//! build entries, and write data into them, can be dehydrated and hydrated.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::types::{QueryConfig, QueryKey, QueryState};

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// One cached query.
///
/// Implementations must make every method atomic with respect to the entry:
/// a concurrent fetch completion and a snapshot write may race, but must not
/// interleave into a half-written state.
pub trait CachedQuery: Send + Sync {
    /// Returns the key the entry was built with.
    fn query_key(&self) -> &QueryKey;

    /// Returns a consistent view of data, freshness and status.
    fn state(&self) -> QueryState;

    /// Returns the retention duration of the entry.
    fn cache_time(&self) -> Duration;

    /// Writes data and its freshness timestamp.
    ///
    /// `None` records freshness without touching the stored value.
    fn set_data(&self, data: Option<Value>, updated_at: u64) -> Result<()>;

    /// Writes data only if the entry is strictly older than `updated_at`.
    ///
    /// Returns whether the write happened. The default implementation reads
    /// and then writes; caches with their own locking should override it to
    /// do both under one lock.
    fn set_data_if_newer(&self, data: Value, updated_at: u64) -> Result<bool> {
        if self.state().updated_at < updated_at {
            self.set_data(Some(data), updated_at)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Populates an entry the caller has just built.
    ///
    /// The entry may have been built and written concurrently. An untouched
    /// entry takes `data` and `updated_at` as given; otherwise only strictly
    /// newer `Some` data is written (see [`QueryState::accepts_initial`]).
    /// Returns whether the write happened. Like
    /// [`set_data_if_newer`](Self::set_data_if_newer), the default reads and
    /// then writes.
    fn set_initial_data(&self, data: Option<Value>, updated_at: u64) -> Result<bool> {
        if self.state().accepts_initial(data.is_some(), updated_at) {
            self.set_data(data, updated_at)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A store of cached queries.
///
/// Implementations might be:
/// - An in-memory map (see `qsnap-cache`)
/// - A bridge to a UI framework's query client
/// - A wrapper that records writes for testing
pub trait QueryCache: Send + Sync {
    /// Entry type handed out by the cache.
    type Query: CachedQuery;

    /// Returns every entry, in an order that is stable for this call.
    fn queries(&self) -> Vec<Arc<Self::Query>>;

    /// Looks up an entry by key.
    fn find(&self, key: &QueryKey) -> Option<Arc<Self::Query>>;

    /// Builds an entry for `key`.
    ///
    /// If an entry for `key` already exists (for instance, because it was
    /// built concurrently) that entry is returned unchanged. Populate the
    /// result with [`CachedQuery::set_initial_data`].
    ///
    /// # Errors
    /// Returns the cache's own error when the key or config is refused.
    fn build(&self, key: &QueryKey, config: QueryConfig) -> Result<Arc<Self::Query>>;
}
