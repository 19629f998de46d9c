//! Bounded, time-queryable log of operator-facing alerts

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::info;
use unigate_telemetry::{SystemTimeProvider, TimeProvider};

/// Maximum number of alert records retained (oldest evicted first)
pub const ALERT_CAP: usize = 1000;

/// Operator-facing severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One logged alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Milliseconds since Unix epoch
    pub timestamp: i64,
    pub alert_type: String,
    pub level: AlertLevel,
    pub message: String,
}

/// Bounded in-memory alert history
pub struct AlertLog {
    records: RwLock<VecDeque<AlertRecord>>,
    time: Arc<dyn TimeProvider>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_time_provider(Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(time: Arc<dyn TimeProvider>) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(ALERT_CAP)),
            time,
        }
    }

    /// Append an alert stamped with the current time, trimming to
    /// [`ALERT_CAP`] records (oldest first).
    pub fn add(&self, alert_type: &str, message: &str, level: AlertLevel) {
        info!("Alert [{}] {}: {}", level, alert_type, message);
        let record = AlertRecord {
            timestamp: self.time.now_millis(),
            alert_type: alert_type.to_string(),
            level,
            message: message.to_string(),
        };
        let mut records = self.records.write();
        records.push_back(record);
        while records.len() > ALERT_CAP {
            records.pop_front();
        }
    }

    /// Alerts from the last `since_hours` hours, in insertion order
    pub fn query(&self, since_hours: u64) -> Vec<AlertRecord> {
        let cutoff = self.time.now_millis() - (since_hours as i64) * 3_600_000;
        self.records
            .read()
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Total records currently retained
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
