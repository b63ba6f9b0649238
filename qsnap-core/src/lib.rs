//! # qsnap Core
//!
//! Core types, errors, and cache traits for moving query caches across an
//! execution boundary.
//!
//! This crate provides the building blocks shared by the other qsnap crates:
//!
//! - **Types**: query keys, query state, and the snapshot wire format
//! - **Errors**: a single error enum with classification helpers
//! - **Constants**: default retention and snapshot field names
//! - **Traits**: the interface a cache must offer to be dehydrated or hydrated
//!
//! ## Example
//!
//! ```rust
//! use qsnap_core::{QueryKey, Snapshot};
//!
//! let key = QueryKey::from("todos");
//! assert_eq!(key.query_hash(), r#"["todos"]"#);
//!
//! let snapshot = Snapshot::from_json(r#"{"records":[]}"#).unwrap();
//! assert!(snapshot.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{QsnapError, Result};
pub use traits::*;
pub use types::*;
