//! In-memory telemetry store implementation
//!
//! Uses DashMap for concurrent access; each series window is guarded by its
//! own lock so concurrent append-and-trim on one series never loses updates.

use crate::time::{SystemTimeProvider, TimeProvider};
use crate::traits::{SeriesRecord, TelemetryStore, SERIES_CAP};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// One cache entry with its time-to-live
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at_ms: i64,
    ttl_ms: i64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.stored_at_ms > self.ttl_ms
    }
}

/// In-memory telemetry store with concurrent access support
pub struct MemoryStore {
    cache: DashMap<String, CacheEntry>,
    series: DashMap<String, RwLock<VecDeque<SeriesRecord>>>,
    time: Arc<dyn TimeProvider>,
}

impl MemoryStore {
    /// Create a new in-memory store using the system clock
    pub fn new() -> Self {
        Self::with_time_provider(Arc::new(SystemTimeProvider))
    }

    /// Create a store with an injected time provider (deterministic tests)
    pub fn with_time_provider(time: Arc<dyn TimeProvider>) -> Self {
        Self {
            cache: DashMap::new(),
            series: DashMap::new(),
            time,
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.cache.clear();
        self.series.clear();
    }

    /// Get statistics about stored data
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            cache_count: self.cache.len(),
            series_count: self.series.len(),
        }
    }

    // Synchronous core used both by the trait impl and by FileStore,
    // which layers persistence on top of the same window semantics.

    pub(crate) fn put_sync(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at_ms: self.time.now_millis(),
            ttl_ms: ttl.as_millis() as i64,
        };
        self.cache.insert(key.to_string(), entry);
    }

    pub(crate) fn get_sync(&self, key: &str) -> Option<Value> {
        let now = self.time.now_millis();
        match self.cache.get(key) {
            Some(entry) if entry.is_expired(now) => {},
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        }
        // Guard dropped above; safe to take the shard write lock now.
        self.cache.remove(key);
        trace!("Evicted expired cache entry: {}", key);
        None
    }

    /// Append a record, returning the record evicted by the cap, if any
    pub(crate) fn append_series_sync(
        &self,
        series: &str,
        timestamp_ms: i64,
        data: Value,
    ) -> Option<SeriesRecord> {
        let window = self
            .series
            .entry(series.to_string())
            .or_insert_with(|| RwLock::new(VecDeque::with_capacity(SERIES_CAP)));
        let mut window = window.write();
        window.push_back(SeriesRecord {
            timestamp: timestamp_ms,
            data,
        });
        if window.len() > SERIES_CAP {
            window.pop_front()
        } else {
            None
        }
    }

    pub(crate) fn read_series_sync(&self, series: &str, limit: Option<usize>) -> Vec<SeriesRecord> {
        let Some(window) = self.series.get(series) else {
            return Vec::new();
        };
        let window = window.read();
        let skip = match limit {
            Some(limit) if limit < window.len() => window.len() - limit,
            _ => 0,
        };
        window.iter().skip(skip).cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about memory store usage
#[derive(Debug, Clone)]
pub struct MemoryStats {
    pub cache_count: usize,
    pub series_count: usize,
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.put_sync(key, value, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get_sync(key))
    }

    async fn cache_len(&self) -> Result<usize> {
        Ok(self.cache.len())
    }

    async fn append_series(&self, series: &str, timestamp_ms: i64, data: Value) -> Result<()> {
        self.append_series_sync(series, timestamp_ms, data);
        Ok(())
    }

    async fn read_series(&self, series: &str, limit: Option<usize>) -> Result<Vec<SeriesRecord>> {
        Ok(self.read_series_sync(series, limit))
    }

    async fn series_names(&self) -> Result<Vec<String>> {
        Ok(self.series.iter().map(|e| e.key().clone()).collect())
    }
}
