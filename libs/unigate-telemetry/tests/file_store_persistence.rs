//! Integration tests for the file-backed telemetry store

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use unigate_telemetry::{FileStore, FixedTimeProvider, SeriesRecord, TelemetryStore, SERIES_CAP};

#[tokio::test]
async fn test_series_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = FileStore::open(dir.path()).unwrap();
        store.append_series("temperature", 1, json!(21.5)).await.unwrap();
        store.append_series("temperature", 2, json!(22.0)).await.unwrap();
        store.append_series("humidity", 1, json!(40)).await.unwrap();
    }

    let reopened = FileStore::open(dir.path()).unwrap();
    let records = reopened.read_series("temperature", None).await.unwrap();
    assert_eq!(
        records,
        vec![
            SeriesRecord { timestamp: 1, data: json!(21.5) },
            SeriesRecord { timestamp: 2, data: json!(22.0) },
        ]
    );

    let mut names = reopened.series_names().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["humidity", "temperature"]);
}

#[tokio::test]
async fn test_file_stays_bounded_at_cap() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    for i in 1..=(SERIES_CAP as i64 + 5) {
        store.append_series("power", i, json!(i)).await.unwrap();
    }

    let records = store.read_series("power", None).await.unwrap();
    assert_eq!(records.len(), SERIES_CAP);
    assert_eq!(records.first().unwrap().timestamp, 6);

    // The overflow rewrite keeps the file itself at the cap too
    let contents = std::fs::read_to_string(dir.path().join("power.jsonl")).unwrap();
    assert_eq!(contents.lines().count(), SERIES_CAP);

    // And a reopen sees exactly the trimmed window
    drop(store);
    let reopened = FileStore::open(dir.path()).unwrap();
    let records = reopened.read_series("power", None).await.unwrap();
    assert_eq!(records.len(), SERIES_CAP);
    assert_eq!(records.last().unwrap().timestamp, SERIES_CAP as i64 + 5);
}

#[tokio::test]
async fn test_corrupt_line_is_skipped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).unwrap();
        store.append_series("voltage", 1, json!(230.0)).await.unwrap();
        store.append_series("voltage", 2, json!(231.0)).await.unwrap();
    }

    // Corrupt the middle of the file
    let path = dir.path().join("voltage.jsonl");
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("{not json\n");
    std::fs::write(&path, contents).unwrap();

    let reopened = FileStore::open(dir.path()).unwrap();
    let records = reopened.read_series("voltage", None).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].timestamp, 2);
}

#[tokio::test]
async fn test_ttl_cache_is_memory_only() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedTimeProvider::new(1_700_000_000_000));

    {
        let store = FileStore::open_with_time_provider(dir.path(), clock.clone()).unwrap();
        store
            .put("last_reading", json!(50.0), Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(store.get("last_reading").await.unwrap(), Some(json!(50.0)));
    }

    // Cache entries do not survive a reopen; series files do
    let reopened = FileStore::open_with_time_provider(dir.path(), clock).unwrap();
    assert_eq!(reopened.get("last_reading").await.unwrap(), None);
}

#[tokio::test]
async fn test_ttl_expiry_in_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedTimeProvider::new(0));
    let store = FileStore::open_with_time_provider(dir.path(), clock.clone()).unwrap();

    store.put("k", json!(1), Duration::from_secs(5)).await.unwrap();
    clock.advance(6_000);
    assert_eq!(store.get("k").await.unwrap(), None);
    assert_eq!(store.cache_len().await.unwrap(), 0);
}
