//! Trait definitions for telemetry storage abstraction

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::time::Duration;

/// Maximum number of records retained per series (FIFO sliding window)
pub const SERIES_CAP: usize = 1000;

/// One record of a telemetry series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Collection time, milliseconds since Unix epoch
    pub timestamp: i64,
    /// Arbitrary payload; analytics coerces it to f64 where possible
    pub data: Value,
}

/// Unified telemetry storage trait
///
/// Combines two independent surfaces:
/// - a key-value cache where every entry carries a time-to-live and expired
///   entries are evicted lazily by the read that discovers them
/// - bounded per-series history windows (most-recent-last, cap [`SERIES_CAP`])
///
/// Implementations:
/// - `MemoryStore`: in-memory backend for production and testing
/// - `FileStore`: append-only jsonl persistence per series
///
/// No transactional multi-key guarantees; each key and each series is
/// independent.
#[async_trait]
pub trait TelemetryStore: Send + Sync + 'static {
    /// Allow downcasting to concrete types
    fn as_any(&self) -> &dyn Any;

    // ========== TTL Cache Operations ==========

    /// Store a value under `key`, overwriting any existing entry
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Get a cached value.
    ///
    /// Returns `None` when the key is absent or its TTL has elapsed; an
    /// expired entry is removed as a side effect of the read.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Number of live cache entries (expired-but-unread entries count until
    /// a read evicts them)
    async fn cache_len(&self) -> Result<usize>;

    // ========== Series History Operations ==========

    /// Append one record to a series window, evicting the oldest record
    /// when the cap is exceeded
    async fn append_series(&self, series: &str, timestamp_ms: i64, data: Value) -> Result<()>;

    /// Read a series in order, most-recent-last, optionally truncated to the
    /// last `limit` records
    async fn read_series(&self, series: &str, limit: Option<usize>) -> Result<Vec<SeriesRecord>>;

    /// Names of all series that currently hold records
    async fn series_names(&self) -> Result<Vec<String>>;
}
