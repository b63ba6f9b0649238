//! In-memory query cache for qsnap.
//!
//! Implements [`qsnap_core::QueryCache`] with insertion-ordered enumeration,
//! per-entry locking and observer notification on data writes.

mod cache;
mod query;

pub use cache::{CacheConfig, CacheStats, MemoryQueryCache};
pub use query::{Query, SubscriptionId};
