//! Domain types for qsnap.
//!
//! - [`QueryKey`]: Identifier of a cache entry
//! - [`QueryState`]: Point-in-time view of a cache entry
//! - [`Snapshot`]: Serializable projection of a cache
//! - [`HydrationConfig`]: Defaults shared by producer and consumer

mod config;
mod key;
mod query;
mod snapshot;

pub use config::*;
pub use key::*;
pub use query::*;
pub use snapshot::*;
