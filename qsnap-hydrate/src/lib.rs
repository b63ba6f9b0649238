//! # qsnap Hydrate
//!
//! Moves cached query results across an execution boundary.
//!
//! - [`dehydrate`] projects the entries of a live cache that pass a predicate
//!   into a [`Snapshot`].
//! - [`hydrate`] merges a snapshot into a (possibly populated) cache. An
//!   existing entry is only overwritten by a strictly newer record; missing
//!   entries are built with the record's overrides on top of the defaults.
//! - [`hydrate_value`] and [`hydrate_json`] accept input of unknown shape and
//!   treat anything that is not a snapshot as an empty one.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qsnap_cache::MemoryQueryCache;
//! use qsnap_hydrate::{dehydrate, hydrate_json, DehydrateOptions, HydrationConfig};
//! use serde_json::json;
//!
//! let server = MemoryQueryCache::new();
//! server.set_query_data("todos", json!(["write docs"]), 100)?;
//!
//! let snapshot = dehydrate(&server, &DehydrateOptions::default());
//! let payload = snapshot.to_json()?;
//!
//! // ...on the other side of the boundary
//! let client = MemoryQueryCache::new();
//! hydrate_json(&client, &payload, &HydrationConfig::default())?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dehydrate;
mod hydrate;

pub use dehydrate::{
    default_should_dehydrate, dehydrate, dehydrate_query, dehydrate_with, DehydrateOptions,
    ShouldDehydrate,
};
pub use hydrate::{hydrate, hydrate_json, hydrate_value, HydrationReport};

pub use qsnap_core::types::{HydrationConfig, Snapshot, SnapshotRecord};
