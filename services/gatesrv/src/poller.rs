//! Periodic register acquisition
//!
//! Reads every configured register from every connected field-bus protocol
//! on a fixed cadence, stores the decoded values, and dispatches them to the
//! router. A failing register or protocol skips that item only; the cycle
//! always completes.

use crate::config::IndustrialConfig;
use crate::registry::ConnectionRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unigate_codec::{decode, RegisterEncoding};
use unigate_routing::MessageRouter;
use unigate_telemetry::{TelemetryStore, TimeProvider};

pub struct RegisterPoller {
    registry: Arc<ConnectionRegistry>,
    router: Arc<MessageRouter>,
    store: Arc<dyn TelemetryStore>,
    time: Arc<dyn TimeProvider>,
    config: IndustrialConfig,
    ttl: Duration,
}

impl RegisterPoller {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        router: Arc<MessageRouter>,
        store: Arc<dyn TelemetryStore>,
        time: Arc<dyn TimeProvider>,
        config: IndustrialConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            registry,
            router,
            store,
            time,
            config,
            ttl,
        }
    }

    /// Poll until cancelled
    pub async fn run(&self, token: CancellationToken) {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        info!(
            "Register poller started ({} protocols, every {:?})",
            self.config.protocols.len(),
            interval
        );
        loop {
            self.poll_cycle().await;
            tokio::select! {
                () = token.cancelled() => break,
                () = sleep(interval) => {}
            }
        }
        info!("Register poller stopped");
    }

    /// One complete acquisition pass over all protocols and registers
    pub async fn poll_cycle(&self) {
        for protocol in &self.config.protocols {
            let handle = match self.registry.get(protocol) {
                Ok(handle) => handle,
                Err(_) => {
                    debug!("Skipping {}: not connected", protocol);
                    continue;
                }
            };

            for register in &self.config.registers {
                let encoding = RegisterEncoding::parse(&register.data_type);
                let words = match handle
                    .transport
                    .read_holding_registers(
                        register.address,
                        encoding.width() as u16,
                        handle.unit_id,
                    )
                    .await
                {
                    Ok(words) => words,
                    Err(e) => {
                        warn!(
                            "Read of {} ({}@{}) failed: {}",
                            register.name, protocol, register.address, e
                        );
                        continue;
                    }
                };

                let value = match decode(&words, encoding) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Decode of {} failed: {}", register.name, e);
                        continue;
                    }
                };
                let value_json = match serde_json::to_value(&value) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Serialization of {} failed: {}", register.name, e);
                        continue;
                    }
                };

                let now = self.time.now_millis();
                if let Err(e) = self
                    .store
                    .put(&register.name, value_json.clone(), self.ttl)
                    .await
                {
                    warn!("Cache write for {} failed: {}", register.name, e);
                }
                if let Err(e) = self
                    .store
                    .append_series(&register.name, now, value_json.clone())
                    .await
                {
                    warn!("History append for {} failed: {}", register.name, e);
                }

                let message = json!({
                    "series": register.name,
                    "value": value_json,
                    "protocol": protocol,
                });
                match serde_json::to_vec(&message) {
                    Ok(raw) => self.router.dispatch(protocol, &raw).await,
                    Err(e) => warn!("Dispatch encoding for {} failed: {}", register.name, e),
                }
            }
        }
    }
}
