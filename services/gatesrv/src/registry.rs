//! Connection registry
//!
//! Holds one opened transport handle per configured protocol. The registry
//! performs no I/O itself; it only tracks liveness and hands out the bound
//! capability. Handles are created during startup and never recreated
//! mid-run.

use crate::config::IndustrialConfig;
use crate::transport::{RegisterTransport, TransportFactory};
use errors::{GatewayError, GatewayResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A named, opened endpoint for one protocol
#[derive(Clone)]
pub struct ConnectionHandle {
    pub protocol: String,
    pub transport: Arc<dyn RegisterTransport>,
    /// Sub-address of the device on the shared physical transport
    pub unit_id: u8,
}

/// Named transport handles, one per protocol
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Open every configured protocol through the factory.
    ///
    /// Failures are isolated per protocol: a protocol that fails to open is
    /// logged and left absent, and the remaining protocols are still
    /// attempted. Callers must check [`get`](Self::get) before use.
    pub async fn open_all(&self, config: &IndustrialConfig, factory: &dyn TransportFactory) {
        for protocol in &config.protocols {
            match factory.create(protocol, config).await {
                Ok(transport) => {
                    info!("Protocol {} connected", protocol);
                    self.connections.write().insert(
                        protocol.clone(),
                        ConnectionHandle {
                            protocol: protocol.clone(),
                            transport,
                            unit_id: config.unit_id,
                        },
                    );
                },
                Err(e) => {
                    warn!(
                        "Failed to open {}: {:#}; protocol left unconnected",
                        protocol, e
                    );
                },
            }
        }
    }

    /// Register an already-open handle directly
    pub fn insert(&self, handle: ConnectionHandle) {
        self.connections
            .write()
            .insert(handle.protocol.clone(), handle);
    }

    /// Get the handle for a protocol
    pub fn get(&self, protocol: &str) -> GatewayResult<ConnectionHandle> {
        self.connections
            .read()
            .get(protocol)
            .cloned()
            .ok_or_else(|| GatewayError::NotConnected(protocol.to_string()))
    }

    pub fn is_connected(&self, protocol: &str) -> bool {
        self.connections.read().contains_key(protocol)
    }

    /// Close one protocol. Idempotent: closing an absent protocol is a no-op.
    pub fn close(&self, protocol: &str) {
        if self.connections.write().remove(protocol).is_some() {
            info!("Protocol {} closed", protocol);
        }
    }

    /// Close every remaining protocol. Never short-circuits.
    pub fn close_all(&self) {
        let mut connections = self.connections.write();
        for protocol in connections.keys() {
            info!("Protocol {} closed", protocol);
        }
        connections.clear();
    }

    pub fn connected_protocols(&self) -> Vec<String> {
        self.connections.read().keys().cloned().collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::SimulatedRegisterTransport;
    use anyhow::Result;
    use async_trait::async_trait;

    /// Factory that fails for protocols listed in `broken`
    struct PartialFactory {
        broken: Vec<String>,
    }

    #[async_trait]
    impl TransportFactory for PartialFactory {
        async fn create(
            &self,
            protocol: &str,
            _config: &IndustrialConfig,
        ) -> Result<Arc<dyn RegisterTransport>> {
            if self.broken.iter().any(|p| p == protocol) {
                anyhow::bail!("connect refused");
            }
            Ok(Arc::new(SimulatedRegisterTransport::new(1)))
        }
    }

    fn config_with_protocols(protocols: &[&str]) -> IndustrialConfig {
        IndustrialConfig {
            protocols: protocols.iter().map(|s| s.to_string()).collect(),
            ..IndustrialConfig::default()
        }
    }

    #[tokio::test]
    async fn test_one_failed_protocol_does_not_block_others() {
        let registry = ConnectionRegistry::new();
        let factory = PartialFactory {
            broken: vec!["modbus_rtu".to_string()],
        };
        let config = config_with_protocols(&["modbus_tcp", "modbus_rtu", "knx"]);

        registry.open_all(&config, &factory).await;

        assert!(registry.is_connected("modbus_tcp"));
        assert!(registry.is_connected("knx"));
        assert!(!registry.is_connected("modbus_rtu"));
        assert!(matches!(
            registry.get("modbus_rtu"),
            Err(GatewayError::NotConnected(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let factory = PartialFactory { broken: vec![] };
        registry
            .open_all(&config_with_protocols(&["modbus_tcp"]), &factory)
            .await;

        registry.close("modbus_tcp");
        assert!(!registry.is_connected("modbus_tcp"));
        // Second close of the same protocol must not panic or error
        registry.close("modbus_tcp");
        registry.close("never_opened");
    }

    #[tokio::test]
    async fn test_close_all_drains_registry() {
        let registry = ConnectionRegistry::new();
        let factory = PartialFactory { broken: vec![] };
        registry
            .open_all(&config_with_protocols(&["a", "b"]), &factory)
            .await;

        registry.close_all();
        assert!(registry.connected_protocols().is_empty());
    }

    #[tokio::test]
    async fn test_handle_carries_unit_id() {
        let registry = ConnectionRegistry::new();
        let factory = PartialFactory { broken: vec![] };
        let mut config = config_with_protocols(&["modbus_tcp"]);
        config.unit_id = 17;

        registry.open_all(&config, &factory).await;
        assert_eq!(registry.get("modbus_tcp").unwrap().unit_id, 17);
    }
}
