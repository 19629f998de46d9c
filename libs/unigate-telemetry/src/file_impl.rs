//! File-backed telemetry store implementation
//!
//! Persists each series as one append-only record-per-line file at
//! `{storage_path}/{series}.jsonl`, each line a `{"timestamp":..,"data":..}`
//! object. The TTL cache stays in memory; only series history survives a
//! restart. The sliding-window cap is enforced on load and, when the window
//! overflows, by rewriting the file from the trimmed window so the file never
//! grows past the cap.

use crate::error::{Result as TelemetryResult, TelemetryError};
use crate::memory_impl::MemoryStore;
use crate::time::TimeProvider;
use crate::traits::{SeriesRecord, TelemetryStore, SERIES_CAP};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Telemetry store backed by per-series jsonl files
pub struct FileStore {
    dir: PathBuf,
    // Window semantics are identical to the memory backend; this layer only
    // adds persistence.
    mem: MemoryStore,
}

impl FileStore {
    /// Open a file store rooted at `dir`, creating the directory if needed
    /// and loading the tail of every existing series file.
    pub fn open(dir: impl AsRef<Path>) -> TelemetryResult<Self> {
        Self::open_with_time_provider(dir, Arc::new(crate::time::SystemTimeProvider))
    }

    /// Open with an injected time provider (deterministic tests)
    pub fn open_with_time_provider(
        dir: impl AsRef<Path>,
        time: Arc<dyn TimeProvider>,
    ) -> TelemetryResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            mem: MemoryStore::with_time_provider(time),
        };
        store.load_existing()?;
        Ok(store)
    }

    fn series_path(&self, series: &str) -> PathBuf {
        self.dir.join(format!("{series}.jsonl"))
    }

    /// Load the last [`SERIES_CAP`] records of every series file into memory.
    /// Lines that fail to parse are skipped with a warning; a corrupt line
    /// must not make the whole series unreadable.
    fn load_existing(&self) -> TelemetryResult<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(series) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let records = self.read_file(&path)?;
            let skip = records.len().saturating_sub(SERIES_CAP);
            for record in records.into_iter().skip(skip) {
                self.mem
                    .append_series_sync(series, record.timestamp, record.data);
            }
            debug!("Loaded series '{}' from {}", series, path.display());
        }
        info!("File store opened at {}", self.dir.display());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> TelemetryResult<Vec<SeriesRecord>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SeriesRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    let err = TelemetryError::CorruptRecord {
                        file: path.display().to_string(),
                        line: idx + 1,
                        error: e.to_string(),
                    };
                    warn!("Skipping unreadable record: {}", err);
                },
            }
        }
        Ok(records)
    }

    fn append_line(&self, series: &str, record: &SeriesRecord) -> TelemetryResult<()> {
        let path = self.series_path(series);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let line = serde_json::to_string(record)
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Rewrite a series file from its in-memory window. Called after an
    /// overflow eviction so the file stays bounded at the cap.
    fn rewrite_file(&self, series: &str) -> TelemetryResult<()> {
        let path = self.series_path(series);
        let tmp = self.dir.join(format!("{series}.jsonl.tmp"));
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            for record in self.mem.read_series_sync(series, None) {
                let line = serde_json::to_string(&record)
                    .map_err(|e| TelemetryError::StorageError(e.to_string()))?;
                writeln!(writer, "{line}")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for FileStore {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.mem.put_sync(key, value, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.mem.get_sync(key))
    }

    async fn cache_len(&self) -> Result<usize> {
        self.mem.cache_len().await
    }

    async fn append_series(&self, series: &str, timestamp_ms: i64, data: Value) -> Result<()> {
        let record = SeriesRecord {
            timestamp: timestamp_ms,
            data: data.clone(),
        };
        let evicted = self.mem.append_series_sync(series, timestamp_ms, data);
        if evicted.is_some() {
            self.rewrite_file(series)
                .with_context(|| format!("Failed to rewrite series file '{series}'"))?;
        } else {
            self.append_line(series, &record)
                .with_context(|| format!("Failed to append to series file '{series}'"))?;
        }
        Ok(())
    }

    async fn read_series(&self, series: &str, limit: Option<usize>) -> Result<Vec<SeriesRecord>> {
        Ok(self.mem.read_series_sync(series, limit))
    }

    async fn series_names(&self) -> Result<Vec<String>> {
        self.mem.series_names().await
    }
}
