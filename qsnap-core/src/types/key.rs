//! Query keys.
//!
//! A key is an arbitrary JSON value. Two keys are equal when their canonical
//! encodings are equal. Object members are sorted by name and integral
//! floats are written as integers, so neither member order nor `1` vs `1.0`
//! splits one logical query into two cache entries.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{QsnapError, Result};

/// Identifier of a cached query.
///
/// A bare string key is normalized to a single-element array, so `"todos"`
/// and `["todos"]` address the same entry.
///
/// # Example
/// ```
/// use qsnap_core::QueryKey;
/// use serde_json::json;
///
/// let a = QueryKey::new(json!(["todo", {"id": 5, "done": false}]));
/// let b = QueryKey::new(json!(["todo", {"done": false, "id": 5}]));
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct QueryKey {
    value: Value,
    hash: String,
}

impl QueryKey {
    /// Creates a key from a JSON value.
    pub fn new(value: Value) -> Self {
        let value = match value {
            Value::String(s) => Value::Array(vec![Value::String(s)]),
            other => other,
        };
        let hash = canonicalize(&value).to_string();
        Self { value, hash }
    }

    /// Returns the key as supplied (after string normalization).
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Returns the canonical encoding used for equality and lookup.
    pub fn query_hash(&self) -> &str {
        &self.hash
    }

    /// Consumes the key and returns its JSON value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Checks that the key can address a cache entry.
    ///
    /// # Errors
    /// Returns [`QsnapError::InvalidQueryKey`] for a `null` key.
    pub fn validate(&self) -> Result<()> {
        if self.value.is_null() {
            return Err(QsnapError::InvalidQueryKey("key must not be null".into()));
        }
        Ok(())
    }
}

/// Largest integer a double represents exactly (2^53).
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Rebuilds `value` with every object's members in name order and integral
/// floats written as integers.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Number(number) if number.is_f64() => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT_INT => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(members.len());
            for (name, member) in members {
                sorted.insert(name.clone(), canonicalize(member));
            }
            Value::Object(sorted)
        }
        scalar => scalar.clone(),
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl PartialOrd for QueryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QueryKey").field(&self.hash).finish()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

impl From<Value> for QueryKey {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<&str> for QueryKey {
    fn from(value: &str) -> Self {
        Self::new(Value::String(value.to_string()))
    }
}

impl Serialize for QueryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}
