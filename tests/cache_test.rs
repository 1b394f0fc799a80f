//! KeyedCache round-trip and invalidation

use deprisk::cache::{KeyedCache, CACHE_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    name: String,
    stars: u64,
}

#[test]
fn test_round_trip_survives_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let value = Snapshot {
        name: "widget".into(),
        stars: 12,
    };
    KeyedCache::new(dir.path())
        .set_as("gh:repo:acme/widget", &value, HOUR)
        .unwrap();

    let reopened = KeyedCache::new(dir.path());
    assert_eq!(reopened.get_as::<Snapshot>("gh:repo:acme/widget"), Some(value));
    assert_eq!(reopened.get("gh:repo:acme/other"), None);
}

#[test]
fn test_expired_record_is_a_miss_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let cache = KeyedCache::new(dir.path());
    cache
        .set("pub:package:http", &json!({"v": 1}), Duration::ZERO)
        .unwrap();

    assert_eq!(cache.get("pub:package:http"), None);
    assert!(!cache.record_path("pub:package:http").exists());
}

#[test]
fn test_schema_bump_invalidates_old_records() {
    let dir = tempfile::tempdir().unwrap();
    let old = KeyedCache::new(dir.path());
    old.set("pub:package:http", &json!({"v": 1}), HOUR).unwrap();

    let bumped = KeyedCache::new(dir.path()).with_schema_version(CACHE_SCHEMA_VERSION + 1);
    assert_eq!(bumped.get("pub:package:http"), None);
    // The stale record is gone for the old reader too
    assert_eq!(old.get("pub:package:http"), None);
}

#[test]
fn test_corrupt_record_heals() {
    let dir = tempfile::tempdir().unwrap();
    let cache = KeyedCache::new(dir.path());
    cache.set("probe:x", &json!(true), HOUR).unwrap();
    std::fs::write(cache.record_path("probe:x"), b"{not json").unwrap();

    assert_eq!(cache.get("probe:x"), None);
    cache.set("probe:x", &json!(false), HOUR).unwrap();
    assert_eq!(cache.get("probe:x"), Some(json!(false)));
}

#[test]
fn test_shape_mismatch_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = KeyedCache::new(dir.path());
    cache.set("gh:repo:acme/widget", &json!([1, 2, 3]), HOUR).unwrap();
    assert_eq!(cache.get_as::<Snapshot>("gh:repo:acme/widget"), None);
}

#[test]
fn test_clear_and_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let cache = KeyedCache::new(dir.path());
    for i in 0..4 {
        cache
            .set(&format!("pub:package:p{}", i), &json!(i), HOUR)
            .unwrap();
    }
    assert_eq!(cache.clear().unwrap(), 4);
    assert_eq!(cache.get("pub:package:p0"), None);

    let off = KeyedCache::disabled();
    off.set("pub:package:p0", &json!(0), HOUR).unwrap();
    assert_eq!(off.get("pub:package:p0"), None);
    assert_eq!(off.clear().unwrap(), 0);
}

#[test]
fn test_concurrent_writers_leave_one_whole_record() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(KeyedCache::new(dir.path()));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    cache
                        .set("pub:package:race", &json!({"writer": i}), HOUR)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let value = cache.get("pub:package:race").unwrap();
    assert!(value["writer"].as_u64().is_some_and(|w| w < 8));
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
        .count();
    assert_eq!(leftovers, 0);
}
