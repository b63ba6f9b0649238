//! A single cached query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use qsnap_core::error::Result;
use qsnap_core::traits::CachedQuery;
use qsnap_core::types::{QueryKey, QueryState, QueryStatus};

type Listener = Arc<dyn Fn(&QueryState) + Send + Sync>;

/// Handle returned by [`Query::subscribe`].
pub type SubscriptionId = u64;

/// Cached query with its own lock.
///
/// State transitions:
/// - `set_data(Some(_))` → `Success`, error cleared
/// - `set_data(None)` → freshness only, status and value unchanged
/// - `fetch_started` → `Loading`, value kept
/// - `fetch_failed` → `Error`, value kept
///
/// Every data write notifies subscribers after the lock is released.
pub struct Query {
    key: QueryKey,
    cache_time: Duration,
    state: RwLock<QueryState>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl Query {
    pub(crate) fn new(key: QueryKey, cache_time: Duration) -> Self {
        Self {
            key,
            cache_time,
            state: RwLock::new(QueryState::default()),
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Returns the key.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Returns the current status.
    pub fn status(&self) -> QueryStatus {
        self.state.read().status
    }

    /// Returns a copy of the current value.
    pub fn data(&self) -> Option<Value> {
        self.state.read().data.clone()
    }

    /// Returns the freshness timestamp in milliseconds.
    pub fn updated_at(&self) -> u64 {
        self.state.read().updated_at
    }

    /// Writes data stamped with the current wall clock.
    pub fn set_data_now(&self, data: Value) -> u64 {
        let updated_at = current_timestamp_ms();
        self.write(Some(data), updated_at);
        updated_at
    }

    /// Marks a fetch as in flight.
    pub fn fetch_started(&self) {
        let mut state = self.state.write();
        state.status = QueryStatus::Loading;
    }

    /// Marks the last fetch as failed. The previous value is kept.
    pub fn fetch_failed(&self, error: impl Into<String>) {
        let mut state = self.state.write();
        state.status = QueryStatus::Error;
        state.error = Some(error.into());
    }

    /// Registers a callback invoked with the new state after each data write.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QueryState) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Returns the number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn write(&self, data: Option<Value>, updated_at: u64) {
        let snapshot = {
            let mut state = self.state.write();
            apply(&mut state, data, updated_at);
            state.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, state: &QueryState) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(key = %self.key, subscribers = listeners.len(), "Notifying subscribers");
        for listener in listeners {
            listener(state);
        }
    }
}

fn apply(state: &mut QueryState, data: Option<Value>, updated_at: u64) {
    if let Some(data) = data {
        state.data = Some(data);
        state.status = QueryStatus::Success;
        state.error = None;
    }
    state.updated_at = updated_at;
}

impl CachedQuery for Query {
    fn query_key(&self) -> &QueryKey {
        &self.key
    }

    fn state(&self) -> QueryState {
        self.state.read().clone()
    }

    fn cache_time(&self) -> Duration {
        self.cache_time
    }

    fn set_data(&self, data: Option<Value>, updated_at: u64) -> Result<()> {
        self.write(data, updated_at);
        Ok(())
    }

    fn set_data_if_newer(&self, data: Value, updated_at: u64) -> Result<bool> {
        let snapshot = {
            let mut state = self.state.write();
            if state.updated_at >= updated_at {
                return Ok(false);
            }
            apply(&mut state, Some(data), updated_at);
            state.clone()
        };
        self.notify(&snapshot);
        Ok(true)
    }

    fn set_initial_data(&self, data: Option<Value>, updated_at: u64) -> Result<bool> {
        let snapshot = {
            let mut state = self.state.write();
            if !state.accepts_initial(data.is_some(), updated_at) {
                return Ok(false);
            }
            apply(&mut state, data, updated_at);
            state.clone()
        };
        self.notify(&snapshot);
        Ok(true)
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("cache_time", &self.cache_time)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

/// Returns current Unix time in milliseconds.
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
