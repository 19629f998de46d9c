//! Timestamped JSON backup snapshots
//!
//! Writes one pretty-printed file per snapshot under the configured backup
//! directory, named `backup_{source}_{YYYYMMDD_HHMMSS}.json`. Backup failures
//! are reported to the caller but never considered fatal to the agent.

use chrono::{TimeZone, Utc};
use errors::{GatewayError, GatewayResult};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use unigate_telemetry::TimeProvider;

pub struct BackupWriter {
    dir: PathBuf,
    time: Arc<dyn TimeProvider>,
}

impl BackupWriter {
    pub fn new(dir: impl AsRef<Path>, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            time,
        }
    }

    /// Write one snapshot and return its path
    pub fn create_backup(&self, source: &str, data: &Value) -> GatewayResult<PathBuf> {
        let now_ms = self.time.now_millis();
        let now = Utc
            .timestamp_millis_opt(now_ms)
            .single()
            .ok_or_else(|| GatewayError::Storage(format!("invalid timestamp {now_ms}")))?;

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "backup_{}_{}.json",
            source,
            now.format("%Y%m%d_%H%M%S")
        ));

        let snapshot = json!({
            "source": source,
            "timestamp": now.to_rfc3339(),
            "data": data,
        });
        fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)?;
        info!("Backup written: {}", path.display());
        Ok(path)
    }
}
