//! End-to-end behavior of dehydrate → transport → hydrate.

use std::time::Duration;

use proptest::prelude::*;
use serde_json::{json, Value};
use test_case::test_case;

use qsnap_cache::MemoryQueryCache;
use qsnap_core::traits::{CachedQuery, QueryCache};
use qsnap_core::types::{QueryConfig, QueryKey, QueryStatus, Snapshot, SnapshotRecord};
use qsnap_hydrate::{dehydrate, hydrate, hydrate_json, hydrate_value, DehydrateOptions, HydrationConfig};

fn config() -> HydrationConfig {
    HydrationConfig::default()
}

fn single(key: &str, data: Value, updated_at: u64) -> Snapshot {
    Snapshot::new(vec![SnapshotRecord::new(QueryKey::from(key), Some(data), updated_at)])
}

#[test]
fn test_roundtrip_into_empty_cache() {
    let source = MemoryQueryCache::new();
    source
        .set_query_data(json!(["user", {"id": 7}]), json!({"name": "ada"}), 1_700_000_000_123)
        .unwrap();

    let snapshot = dehydrate(&source, &DehydrateOptions::default());
    let target = MemoryQueryCache::new();
    hydrate(&target, &snapshot, &config()).unwrap();

    let query = target.find(&QueryKey::new(json!(["user", {"id": 7}]))).unwrap();
    assert_eq!(query.data(), Some(json!({"name": "ada"})));
    assert_eq!(query.updated_at(), 1_700_000_000_123);
    assert_eq!(target.len(), 1);
}

#[test]
fn test_roundtrip_through_json() {
    let source = MemoryQueryCache::new();
    source.set_query_data("nothing", Value::Null, 5).unwrap();
    source
        .build(&QueryKey::from("short"), QueryConfig::with_cache_time(Duration::from_secs(10)))
        .unwrap()
        .set_data(Some(json!(false)), 6)
        .unwrap();

    let payload = dehydrate(&source, &DehydrateOptions::default()).to_json().unwrap();
    let target = MemoryQueryCache::new();
    let report = hydrate_json(&target, &payload, &config()).unwrap();
    assert_eq!(report.created, 2);

    let nothing = target.find(&QueryKey::from("nothing")).unwrap();
    assert_eq!(nothing.data(), Some(Value::Null));
    let short = target.find(&QueryKey::from("short")).unwrap();
    assert_eq!(short.data(), Some(json!(false)));
    assert_eq!(short.cache_time(), Duration::from_secs(10));
}

#[test]
fn test_no_regression_when_local_is_newer() {
    let cache = MemoryQueryCache::new();
    cache.set_query_data("a", json!("local"), 200).unwrap();

    let report = hydrate(&cache, &single("a", json!("stale"), 150), &config()).unwrap();
    assert_eq!(report.skipped, 1);

    let query = cache.find(&QueryKey::from("a")).unwrap();
    assert_eq!(query.data(), Some(json!("local")));
    assert_eq!(query.updated_at(), 200);
}

#[test]
fn test_strict_improvement_overwrites() {
    let cache = MemoryQueryCache::new();
    cache.set_query_data("a", json!("old"), 100).unwrap();

    let report = hydrate(&cache, &single("a", json!("new"), 101), &config()).unwrap();
    assert_eq!(report.updated, 1);

    let query = cache.find(&QueryKey::from("a")).unwrap();
    assert_eq!(query.data(), Some(json!("new")));
    assert_eq!(query.updated_at(), 101);
}

#[test]
fn test_default_predicate_exports_settled_queries_only() {
    let cache = MemoryQueryCache::new();
    cache.set_query_data("done", json!(1), 10).unwrap();
    cache
        .build(&QueryKey::from("pending"), QueryConfig::default())
        .unwrap()
        .fetch_started();

    let snapshot = dehydrate(&cache, &DehydrateOptions::default());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.records[0].key, QueryKey::from("done"));
}

#[test]
fn test_sparse_overrides() {
    let cache = MemoryQueryCache::new();
    cache.set_query_data("default", json!(1), 1).unwrap();
    cache
        .build(&QueryKey::from("custom"), QueryConfig::with_cache_time(Duration::from_millis(1234)))
        .unwrap()
        .set_data(Some(json!(2)), 1)
        .unwrap();

    let encoded = serde_json::to_value(dehydrate(&cache, &DehydrateOptions::default())).unwrap();
    assert_eq!(encoded["records"][0]["config"], json!({}));
    assert_eq!(encoded["records"][1]["config"], json!({"cacheTime": 1234}));
}

#[test_case(json!(null) ; "null")]
#[test_case(json!(3) ; "number")]
#[test_case(json!({}) ; "object without records")]
#[test_case(json!({"records": "nope"}) ; "records not a list")]
#[test_case(json!([{"key": ["a"], "data": 1, "updatedAt": 1, "config": {}}]) ; "bare list")]
fn test_malformed_input_is_a_noop(input: Value) {
    let cache = MemoryQueryCache::new();
    cache.set_query_data("a", json!("keep"), 1).unwrap();

    let report = hydrate_value(&cache, &input, &config()).unwrap();
    assert!(report.malformed);
    assert_eq!(report.applied(), 0);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get_query_data(&QueryKey::from("a")), Some(json!("keep")));
    assert_eq!(cache.find(&QueryKey::from("a")).unwrap().updated_at(), 1);
}

#[test]
fn test_end_to_end_scenario() {
    let c1 = MemoryQueryCache::new();
    c1.set_query_data("a", json!(5), 100).unwrap();
    c1.build(&QueryKey::from("b"), QueryConfig::default())
        .unwrap()
        .fetch_started();

    let snapshot = dehydrate(&c1, &DehydrateOptions::default());
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        json!({"records": [{"key": ["a"], "data": 5, "updatedAt": 100, "config": {}}]})
    );

    let c2 = MemoryQueryCache::new();
    hydrate(&c2, &snapshot, &config()).unwrap();
    assert_eq!(c2.len(), 1);
    let a = c2.find(&QueryKey::from("a")).unwrap();
    assert_eq!(a.data(), Some(json!(5)));
    assert_eq!(a.updated_at(), 100);
    assert_eq!(a.status(), QueryStatus::Success);
}

#[test]
fn test_partial_overlap_merge() {
    let server = MemoryQueryCache::new();
    server.set_query_data("shared", json!("server"), 50).unwrap();
    server.set_query_data("server-only", json!(1), 50).unwrap();

    let client = MemoryQueryCache::new();
    client.set_query_data("shared", json!("client"), 80).unwrap();
    client.set_query_data("client-only", json!(2), 10).unwrap();

    let snapshot = dehydrate(&server, &DehydrateOptions::default());
    let report = hydrate(&client, &snapshot, &config()).unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);

    assert_eq!(client.len(), 3);
    assert_eq!(client.get_query_data(&QueryKey::from("shared")), Some(json!("client")));
    assert_eq!(client.get_query_data(&QueryKey::from("server-only")), Some(json!(1)));
    assert_eq!(client.get_query_data(&QueryKey::from("client-only")), Some(json!(2)));
}

#[test]
fn test_hydrating_twice_is_idempotent() {
    let snapshot = single("a", json!([1, 2, 3]), 42);
    let cache = MemoryQueryCache::new();

    let first = hydrate(&cache, &snapshot, &config()).unwrap();
    let second = hydrate(&cache, &snapshot, &config()).unwrap();
    assert_eq!(first.created, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(cache.len(), 1);
}

proptest! {
    #[test]
    fn prop_freshness_decides_the_winner(local in 0u64..1_000_000, incoming in 0u64..1_000_000) {
        let cache = MemoryQueryCache::new();
        cache.set_query_data("k", json!("local"), local).unwrap();

        hydrate(&cache, &single("k", json!("incoming"), incoming), &config()).unwrap();

        let query = cache.find(&QueryKey::from("k")).unwrap();
        if local < incoming {
            prop_assert_eq!(query.data(), Some(json!("incoming")));
            prop_assert_eq!(query.updated_at(), incoming);
        } else {
            prop_assert_eq!(query.data(), Some(json!("local")));
            prop_assert_eq!(query.updated_at(), local);
        }
    }

    #[test]
    fn prop_roundtrip_preserves_timestamps(stamps in proptest::collection::vec(0u64..u64::MAX / 2, 0..16)) {
        let source = MemoryQueryCache::new();
        for (i, stamp) in stamps.iter().enumerate() {
            source.set_query_data(json!(["item", i]), json!(i), *stamp).unwrap();
        }

        let snapshot = dehydrate(&source, &DehydrateOptions::default());
        prop_assert_eq!(snapshot.len(), stamps.len());

        let target = MemoryQueryCache::new();
        hydrate(&target, &snapshot, &config()).unwrap();
        for (i, stamp) in stamps.iter().enumerate() {
            let query = target.find(&QueryKey::new(json!(["item", i]))).unwrap();
            prop_assert_eq!(query.updated_at(), *stamp);
        }
    }
}
