//! Built-in message handlers
//!
//! Registered on the router at startup: telemetry collection for inbound
//! mesh frames, broker forwarding, and threshold alerting. Each handler is
//! independent; the router isolates their failures.

use crate::config::ThresholdConfig;
use crate::transport::{LineTransport, PubSubTransport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use unigate_analytics::{AlertLevel, AlertLog};
use unigate_routing::MessageHandler;
use unigate_telemetry::{TelemetryStore, TimeProvider};

/// Series name for a dispatched message: explicit `series` field, else the
/// protocol the message arrived on.
fn series_of<'a>(protocol: &'a str, message: &'a Value) -> &'a str {
    message
        .get("series")
        .and_then(Value::as_str)
        .unwrap_or(protocol)
}

/// Payload of a dispatched message: the `value` field when present, else the
/// whole message.
fn payload_of(message: &Value) -> Value {
    message.get("value").cloned().unwrap_or_else(|| message.clone())
}

/// Stores inbound readings into the telemetry cache and series history
pub struct TelemetryCollector {
    store: Arc<dyn TelemetryStore>,
    time: Arc<dyn TimeProvider>,
    ttl: Duration,
}

impl TelemetryCollector {
    pub fn new(store: Arc<dyn TelemetryStore>, time: Arc<dyn TimeProvider>, ttl: Duration) -> Self {
        Self { store, time, ttl }
    }
}

#[async_trait]
impl MessageHandler for TelemetryCollector {
    fn name(&self) -> &str {
        "telemetry-collector"
    }

    async fn handle(&self, protocol: &str, message: &Value) -> anyhow::Result<()> {
        let series = series_of(protocol, message);
        let payload = payload_of(message);
        let now = self.time.now_millis();

        self.store.put(series, payload.clone(), self.ttl).await?;
        self.store.append_series(series, now, payload).await?;
        debug!("Collected {} reading from {}", series, protocol);
        Ok(())
    }
}

/// Forwards inbound readings to the broker under `{prefix}/{series}`
pub struct PubSubForwarder {
    pubsub: Arc<dyn PubSubTransport>,
    topic_prefix: String,
}

impl PubSubForwarder {
    pub fn new(pubsub: Arc<dyn PubSubTransport>, topic_prefix: impl Into<String>) -> Self {
        Self {
            pubsub,
            topic_prefix: topic_prefix.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for PubSubForwarder {
    fn name(&self) -> &str {
        "pubsub-forwarder"
    }

    async fn handle(&self, protocol: &str, message: &Value) -> anyhow::Result<()> {
        let topic = format!("{}/{}", self.topic_prefix, series_of(protocol, message));
        let payload = serde_json::to_vec(message)?;
        self.pubsub.publish(&topic, &payload, 0, false).await
    }
}

/// Relays readings out over the mesh line link, one JSON frame per message
pub struct MeshForwarder {
    line: Arc<dyn LineTransport>,
}

impl MeshForwarder {
    pub fn new(line: Arc<dyn LineTransport>) -> Self {
        Self { line }
    }
}

#[async_trait]
impl MessageHandler for MeshForwarder {
    fn name(&self) -> &str {
        "mesh-forwarder"
    }

    async fn handle(&self, _protocol: &str, message: &Value) -> anyhow::Result<()> {
        self.line.write_line(&serde_json::to_vec(message)?).await
    }
}

/// Raises an operator alert when a numeric reading leaves its configured
/// range. The alert always lands in the log; when a broker is attached it is
/// also published under `alerts/{series}`.
pub struct ThresholdAlerter {
    alerts: Arc<AlertLog>,
    thresholds: HashMap<String, ThresholdConfig>,
    pubsub: Option<Arc<dyn PubSubTransport>>,
}

impl ThresholdAlerter {
    pub fn new(alerts: Arc<AlertLog>, thresholds: &[ThresholdConfig]) -> Self {
        Self {
            alerts,
            thresholds: thresholds
                .iter()
                .map(|t| (t.series.clone(), t.clone()))
                .collect(),
            pubsub: None,
        }
    }

    /// Also publish every raised alert through `pubsub`
    pub fn with_pubsub(mut self, pubsub: Arc<dyn PubSubTransport>) -> Self {
        self.pubsub = Some(pubsub);
        self
    }
}

#[async_trait]
impl MessageHandler for ThresholdAlerter {
    fn name(&self) -> &str {
        "threshold-alerter"
    }

    async fn handle(&self, protocol: &str, message: &Value) -> anyhow::Result<()> {
        let series = series_of(protocol, message);
        let Some(threshold) = self.thresholds.get(series) else {
            return Ok(());
        };
        let Some(value) = payload_of(message).as_f64() else {
            return Ok(());
        };

        if value < threshold.min || value > threshold.max {
            let text = format!(
                "{series} reading {value} outside [{}, {}]",
                threshold.min, threshold.max
            );
            self.alerts.add("threshold", &text, AlertLevel::Warning);

            if let Some(pubsub) = &self.pubsub {
                let payload = serde_json::to_vec(&json!({
                    "series": series,
                    "value": value,
                    "level": AlertLevel::Warning,
                    "message": text,
                }))?;
                pubsub
                    .publish(&format!("alerts/{series}"), &payload, 0, false)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::{SimulatedLineTransport, SimulatedPubSub};
    use serde_json::json;
    use unigate_telemetry::{FixedTimeProvider, MemoryStore};

    #[tokio::test]
    async fn test_collector_stores_cache_and_series() {
        let store = Arc::new(MemoryStore::new());
        let time = Arc::new(FixedTimeProvider::new(1_000));
        let collector = TelemetryCollector::new(store.clone(), time, Duration::from_secs(300));

        collector
            .handle("modbus_tcp", &json!({"series": "temperature", "value": 21.5}))
            .await
            .unwrap();

        assert_eq!(store.get("temperature").await.unwrap(), Some(json!(21.5)));
        let records = store.read_series("temperature", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 1_000);
        assert_eq!(records[0].data, json!(21.5));
    }

    #[tokio::test]
    async fn test_collector_falls_back_to_protocol_series() {
        let store = Arc::new(MemoryStore::new());
        let time = Arc::new(FixedTimeProvider::new(0));
        let collector = TelemetryCollector::new(store.clone(), time, Duration::from_secs(60));

        // Raw frame that could not be parsed as JSON upstream
        collector
            .handle("lora", &json!({"raw": "N1:23.4"}))
            .await
            .unwrap();

        let records = store.read_series("lora", None).await.unwrap();
        assert_eq!(records[0].data, json!({"raw": "N1:23.4"}));
    }

    #[tokio::test]
    async fn test_forwarder_topic_and_payload() {
        let pubsub = Arc::new(SimulatedPubSub::new());
        pubsub
            .connect("localhost", 1883, Duration::from_secs(1))
            .await
            .unwrap();
        let forwarder = PubSubForwarder::new(pubsub.clone(), "sensors");

        let message = json!({"series": "temperature", "value": 50.0});
        forwarder.handle("modbus_tcp", &message).await.unwrap();

        let published = pubsub.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "sensors/temperature");
        let payload: Value = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(payload, message);
    }

    #[tokio::test]
    async fn test_forwarder_propagates_transport_failure() {
        // Not connected, publish fails; the router is responsible for
        // isolating this error
        let pubsub = Arc::new(SimulatedPubSub::new());
        let forwarder = PubSubForwarder::new(pubsub, "sensors");
        assert!(forwarder.handle("x", &json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_mesh_forwarder_writes_frames() {
        let line = Arc::new(SimulatedLineTransport::new());
        let forwarder = MeshForwarder::new(line.clone());

        let message = json!({"series": "temperature", "value": 50.0});
        forwarder.handle("modbus_tcp", &message).await.unwrap();

        let written = line.written();
        assert_eq!(written.len(), 1);
        let frame: Value = serde_json::from_slice(&written[0]).unwrap();
        assert_eq!(frame, message);
    }

    #[tokio::test]
    async fn test_alerter_fires_only_outside_range() {
        let alerts = Arc::new(AlertLog::new());
        let alerter = ThresholdAlerter::new(
            alerts.clone(),
            &[ThresholdConfig {
                series: "temperature".to_string(),
                min: 10.0,
                max: 30.0,
            }],
        );

        alerter
            .handle("m", &json!({"series": "temperature", "value": 21.0}))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 0);

        alerter
            .handle("m", &json!({"series": "temperature", "value": 35.0}))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        let recent = alerts.query(1);
        assert!(recent[0].message.contains("temperature"));
        assert_eq!(recent[0].level, AlertLevel::Warning);
    }

    #[tokio::test]
    async fn test_alerter_publishes_breach_to_broker() {
        let pubsub = Arc::new(SimulatedPubSub::new());
        pubsub
            .connect("localhost", 1883, Duration::from_secs(1))
            .await
            .unwrap();
        let alerts = Arc::new(AlertLog::new());
        let alerter = ThresholdAlerter::new(
            alerts.clone(),
            &[ThresholdConfig {
                series: "temperature".to_string(),
                min: 0.0,
                max: 30.0,
            }],
        )
        .with_pubsub(pubsub.clone());

        alerter
            .handle("modbus_tcp", &json!({"series": "temperature", "value": 50.0}))
            .await
            .unwrap();

        assert_eq!(alerts.len(), 1);
        let published = pubsub.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "alerts/temperature");
        let payload: Value = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(payload["series"], "temperature");
        assert_eq!(payload["value"], 50.0);
        assert_eq!(payload["level"], "warning");

        // In-range readings publish nothing
        alerter
            .handle("modbus_tcp", &json!({"series": "temperature", "value": 21.0}))
            .await
            .unwrap();
        assert_eq!(pubsub.published().len(), 1);
    }

    #[tokio::test]
    async fn test_alerter_ignores_unconfigured_series() {
        let alerts = Arc::new(AlertLog::new());
        let alerter = ThresholdAlerter::new(alerts.clone(), &[]);
        alerter
            .handle("m", &json!({"series": "humidity", "value": 99.0}))
            .await
            .unwrap();
        assert!(alerts.is_empty());
    }
}
