//! Unigate analytics engine
//!
//! Computes descriptive statistics, trend classification and short-horizon
//! forecasts over telemetry series, derives advisory insights, and keeps the
//! operator alert log. The engine only reads from the telemetry store; it
//! never writes to it.

pub mod alerts;
pub mod stats;

pub use alerts::{AlertLevel, AlertLog, AlertRecord, ALERT_CAP};
pub use stats::{Trend, TrendStat, SLOPE_THRESHOLD};

use anyhow::Result;
use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use unigate_telemetry::{SystemTimeProvider, TelemetryStore, TimeProvider};

/// Smoothing factor of the exponential-smoothing forecast
pub const FORECAST_ALPHA: f64 = 0.3;

/// Minimum numeric points a series must hold before forecasting
pub const MIN_FORECAST_POINTS: usize = 10;

/// Default analysis window when none is requested
pub const DEFAULT_WINDOW: usize = 100;

/// Advisory priority of a derived insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    Low,
    Medium,
}

/// Advisory message derived from one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub series: String,
    pub priority: InsightPriority,
    pub message: String,
}

/// Summary section of the daily report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_data_points: usize,
    pub total_alerts: usize,
}

/// Daily operator report: per-series statistics plus derived insights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: String,
    pub summary: ReportSummary,
    pub analytics: HashMap<String, TrendStat>,
    pub insights: Vec<Insight>,
}

/// Coerce one record payload to a numeric value.
///
/// Only JSON numbers and numeric strings coerce; structured payloads are
/// excluded from statistics rather than treated as errors.
fn coerce_numeric(data: &Value) -> Option<f64> {
    match data {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Read-only analytics over a telemetry store
pub struct AnalyticsEngine {
    store: Arc<dyn TelemetryStore>,
    time: Arc<dyn TimeProvider>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self::with_time_provider(store, Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(store: Arc<dyn TelemetryStore>, time: Arc<dyn TimeProvider>) -> Self {
        Self { store, time }
    }

    /// Analyze the last `window` records of a series.
    ///
    /// Returns `None` for a series with no records. Records whose payload
    /// does not coerce to a number are excluded from the statistics; when
    /// none coerce the result is degraded to `count` and `time_span_ms`
    /// only.
    pub async fn analyze(&self, series: &str, window: usize) -> Result<Option<TrendStat>> {
        let records = self.store.read_series(series, Some(window)).await?;
        if records.is_empty() {
            return Ok(None);
        }

        let time_span_ms =
            records.last().map(|r| r.timestamp).unwrap_or(0) - records[0].timestamp;
        let values: Vec<f64> = records.iter().filter_map(|r| coerce_numeric(&r.data)).collect();

        if values.is_empty() {
            debug!("Series '{}' has no numeric-convertible data", series);
            return Ok(Some(TrendStat {
                count: records.len(),
                time_span_ms,
                mean: None,
                std: None,
                min: None,
                max: None,
                median: None,
                trend: None,
            }));
        }

        Ok(Some(TrendStat {
            count: values.len(),
            time_span_ms,
            mean: Some(stats::mean(&values)),
            std: Some(stats::std_dev(&values)),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            median: Some(stats::median(&values)),
            trend: Some(stats::classify_trend(&values)),
        }))
    }

    /// Forecast `periods` future values for a series.
    ///
    /// Returns `None` when the series holds fewer than
    /// [`MIN_FORECAST_POINTS`] numeric points. Uses exponential smoothing
    /// with [`FORECAST_ALPHA`], seeded from the most recent observation.
    /// The update `alpha*prev + (1-alpha)*prev` is algebraically `prev`, so
    /// every produced point equals the last observed value, a flat
    /// continuation.
    pub async fn forecast(&self, series: &str, periods: usize) -> Result<Option<Vec<f64>>> {
        let records = self.store.read_series(series, None).await?;
        let values: Vec<f64> = records.iter().filter_map(|r| coerce_numeric(&r.data)).collect();
        if values.len() < MIN_FORECAST_POINTS {
            return Ok(None);
        }

        let mut prev = values[values.len() - 1];
        let mut forecast = Vec::with_capacity(periods);
        for _ in 0..periods {
            let next = FORECAST_ALPHA * prev + (1.0 - FORECAST_ALPHA) * prev;
            forecast.push(next);
            prev = next;
        }
        Ok(Some(forecast))
    }

    /// Derive advisory insights for every known series.
    ///
    /// A clear trend yields a medium-priority message citing the mean;
    /// otherwise high variability (std above 20% of the mean) yields a
    /// low-priority message; a quiet series yields nothing.
    pub async fn insights(&self) -> Result<Vec<Insight>> {
        let mut names = self.store.series_names().await?;
        names.sort();

        let mut insights = Vec::new();
        for series in names {
            let Some(stat) = self.analyze(&series, DEFAULT_WINDOW).await? else {
                continue;
            };
            let (Some(mean), Some(std)) = (stat.mean, stat.std) else {
                continue;
            };
            match stat.trend {
                Some(trend @ (Trend::Increasing | Trend::Decreasing)) => {
                    insights.push(Insight {
                        series: series.clone(),
                        priority: InsightPriority::Medium,
                        message: format!(
                            "Series '{series}' is {trend} (mean {mean:.2})"
                        ),
                    });
                },
                _ if std > 0.2 * mean.abs() => {
                    insights.push(Insight {
                        series: series.clone(),
                        priority: InsightPriority::Low,
                        message: format!(
                            "Series '{series}' shows high variability (std {std:.2}, mean {mean:.2})"
                        ),
                    });
                },
                _ => {},
            }
        }
        Ok(insights)
    }

    /// Build the daily report: date, totals, per-series statistics and
    /// insights.
    pub async fn daily_report(&self, alert_log: &AlertLog) -> Result<DailyReport> {
        let now = self.time.now_millis();
        let date = chrono::Utc
            .timestamp_millis_opt(now)
            .single()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        let mut names = self.store.series_names().await?;
        names.sort();

        let mut analytics = HashMap::new();
        let mut total_data_points = 0;
        for series in &names {
            let records = self.store.read_series(series, None).await?;
            total_data_points += records.len();
            if let Some(stat) = self.analyze(series, DEFAULT_WINDOW).await? {
                analytics.insert(series.clone(), stat);
            }
        }

        Ok(DailyReport {
            date,
            summary: ReportSummary {
                total_data_points,
                total_alerts: alert_log.query(24).len(),
            },
            analytics,
            insights: self.insights().await?,
        })
    }
}
