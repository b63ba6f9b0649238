//! Snapshot wire format.
//!
//! A snapshot is what crosses the boundary between the producing and the
//! consuming cache:
//!
//! ```text
//! { "records": [ { "key": ..., "data"?: ..., "updatedAt": 100, "config": { "cacheTime"?: 1000 } } ] }
//! ```
//!
//! `data` is omitted when the entry had none; an explicit `null` is a value.
//! `config.cacheTime` is omitted when it equals the agreed default.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::QueryKey;
use crate::constants::{LEGACY_RECORDS_FIELD, RECORDS_FIELD};
use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable projection of one cache entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    /// Key of the source entry
    #[serde(alias = "queryKey")]
    pub key: QueryKey,
    /// Value of the source entry, absent if it had none
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<Value>,
    /// Freshness of `data` at capture time (milliseconds)
    pub updated_at: u64,
    /// Tuning that differs from the defaults
    #[serde(default, rename = "config")]
    pub overrides: RecordOverrides,
}

impl SnapshotRecord {
    /// Creates a record with no overrides.
    pub fn new(key: QueryKey, data: Option<Value>, updated_at: u64) -> Self {
        Self {
            key,
            data,
            updated_at,
            overrides: RecordOverrides::default(),
        }
    }

    /// Sets the retention override.
    pub fn with_cache_time_ms(mut self, cache_time_ms: u64) -> Self {
        self.overrides.cache_time_ms = Some(cache_time_ms);
        self
    }
}

/// Sparse per-record tuning. Every field is optional and only present when
/// it differs from the consumer's default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOverrides {
    /// Retention duration in milliseconds
    #[serde(default, rename = "cacheTime", skip_serializing_if = "Option::is_none")]
    pub cache_time_ms: Option<u64>,
}

impl RecordOverrides {
    /// Returns true if no override is set.
    pub fn is_empty(&self) -> bool {
        self.cache_time_ms.is_none()
    }
}

/// Wraps any present value, including `null`, in `Some`.
///
/// Combined with `#[serde(default)]` this keeps "field absent" (`None`)
/// apart from "field is null" (`Some(Value::Null)`).
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered collection of records produced from one cache.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Records in the producer's enumeration order
    #[serde(alias = "queries")]
    pub records: Vec<SnapshotRecord>,
}

impl Snapshot {
    /// Creates a snapshot from records.
    pub fn new(records: Vec<SnapshotRecord>) -> Self {
        Self { records }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, SnapshotRecord> {
        self.records.iter()
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Strictly parses a snapshot from JSON.
    ///
    /// Use [`Snapshot::parse`] for input whose shape is not guaranteed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Leniently parses an untyped value.
    ///
    /// The top-level shape is checked first: anything that is not an object
    /// holding a record list is [`ParsedSnapshot::Malformed`]. Inside a valid
    /// list, records that do not decode are dropped and counted.
    pub fn parse(value: &Value) -> ParsedSnapshot {
        let Value::Object(map) = value else {
            return ParsedSnapshot::Malformed(MalformedSnapshot::NotAnObject);
        };

        let items = match map.get(RECORDS_FIELD).or_else(|| map.get(LEGACY_RECORDS_FIELD)) {
            None => return ParsedSnapshot::Malformed(MalformedSnapshot::MissingRecords),
            Some(Value::Array(items)) => items,
            Some(_) => return ParsedSnapshot::Malformed(MalformedSnapshot::RecordsNotAList),
        };

        let mut records = Vec::with_capacity(items.len());
        let mut rejected = 0;
        for item in items {
            match SnapshotRecord::deserialize(item) {
                Ok(record) => records.push(record),
                Err(_) => rejected += 1,
            }
        }

        ParsedSnapshot::Valid {
            snapshot: Snapshot::new(records),
            rejected,
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a SnapshotRecord;
    type IntoIter = std::slice::Iter<'a, SnapshotRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LENIENT PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of [`Snapshot::parse`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedSnapshot {
    /// The top-level shape is a snapshot.
    Valid {
        /// Records that decoded
        snapshot: Snapshot,
        /// Number of records that did not decode
        rejected: usize,
    },
    /// The value is not a snapshot at all.
    Malformed(MalformedSnapshot),
}

impl ParsedSnapshot {
    /// Returns the snapshot, or an empty one if the input was malformed.
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            ParsedSnapshot::Valid { snapshot, .. } => snapshot,
            ParsedSnapshot::Malformed(_) => Snapshot::default(),
        }
    }

    /// Returns true if the top-level shape was rejected.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ParsedSnapshot::Malformed(_))
    }
}

/// Why a value was not accepted as a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedSnapshot {
    /// Not a JSON object (null, number, string, array...).
    NotAnObject,
    /// An object without a record list.
    MissingRecords,
    /// The record list is not an array.
    RecordsNotAList,
}

impl fmt::Display for MalformedSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedSnapshot::NotAnObject => f.write_str("snapshot is not an object"),
            MalformedSnapshot::MissingRecords => f.write_str("snapshot has no records field"),
            MalformedSnapshot::RecordsNotAList => f.write_str("snapshot records is not a list"),
        }
    }
}
