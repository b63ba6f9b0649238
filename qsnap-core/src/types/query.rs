//! Query state as seen by dehydration and hydration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a cached query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// No fetch has started and no data was set.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed.
    Error,
    /// The last fetch (or data write) completed.
    Success,
}

impl QueryStatus {
    /// Returns true if the query holds a confirmed, usable result.
    pub fn is_success(&self) -> bool {
        matches!(self, QueryStatus::Success)
    }
}

/// Point-in-time view of a query.
///
/// `data` is `None` when nothing was ever set, and `Some(Value::Null)` when
/// the query resolved to an explicit null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryState {
    /// Current value, if any
    pub data: Option<Value>,
    /// Milliseconds timestamp of the last data write (0 if never written)
    pub updated_at: u64,
    /// Lifecycle status
    pub status: QueryStatus,
    /// Message of the last failed fetch
    pub error: Option<String>,
}

impl QueryState {
    /// Returns true if the query holds data.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Returns true if no data or timestamp was ever written.
    pub fn is_untouched(&self) -> bool {
        self.data.is_none() && self.updated_at == 0
    }

    /// Decides whether the first write into a freshly built entry goes through.
    ///
    /// An untouched entry takes anything. An entry written since it was built
    /// only takes data that is strictly newer; a bare timestamp never lands.
    pub fn accepts_initial(&self, has_data: bool, updated_at: u64) -> bool {
        self.is_untouched() || (has_data && self.updated_at < updated_at)
    }
}

/// Per-query tuning used when building a cache entry.
///
/// Unset fields fall back to the cache's own defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long an idle query is retained
    pub cache_time: Option<Duration>,
}

impl QueryConfig {
    /// Creates a config with an explicit retention duration.
    pub fn with_cache_time(cache_time: Duration) -> Self {
        Self {
            cache_time: Some(cache_time),
        }
    }
}
