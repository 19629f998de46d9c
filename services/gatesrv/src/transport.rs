//! Transport capability contracts and their simulated implementations
//!
//! The core never talks to sockets or serial ports directly; it consumes
//! these narrow capabilities. Production drivers live outside this service,
//! the simulated implementations below satisfy the same contracts with
//! deterministic or seeded-random data for demo runs and tests. Connect,
//! read and write timeouts are the transport's responsibility; callers treat
//! any failure uniformly as a transport error.

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// Capability contracts
// ============================================================================

/// Register-oriented field-bus transport (Modbus-style)
#[async_trait]
pub trait RegisterTransport: Send + Sync + 'static {
    /// Read `count` consecutive holding registers starting at `address`
    async fn read_holding_registers(&self, address: u16, count: u16, unit_id: u8)
        -> Result<Vec<u16>>;

    /// Write a single 16-bit register
    async fn write_register(&self, address: u16, value: u16, unit_id: u8) -> Result<()>;
}

/// Publish/subscribe broker transport (MQTT-style)
#[async_trait]
pub trait PubSubTransport: Send + Sync + 'static {
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<()>;

    async fn subscribe(&self, topic: &str) -> Result<()>;

    async fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()>;
}

/// Streaming line transport (LoRa serial link and similar)
#[async_trait]
pub trait LineTransport: Send + Sync + 'static {
    /// Receive one frame, returning `None` when nothing arrives within
    /// `timeout`
    async fn read_line(&self, timeout: Duration) -> Result<Option<Bytes>>;

    async fn write_line(&self, frame: &[u8]) -> Result<()>;
}

/// Creates a register transport for one configured protocol.
///
/// The registry drives this during startup; a factory failure leaves that
/// protocol absent without blocking the others.
#[async_trait]
pub trait TransportFactory: Send + Sync + 'static {
    async fn create(
        &self,
        protocol: &str,
        config: &crate::config::IndustrialConfig,
    ) -> Result<std::sync::Arc<dyn RegisterTransport>>;
}

// ============================================================================
// Simulated implementations
// ============================================================================

struct SimulatedRegisterState {
    rng: StdRng,
    /// Explicit register contents; reads fall back to random data
    registers: HashMap<u16, u16>,
    failing: bool,
}

/// Register transport returning seeded-random words, with explicit overrides
/// for deterministic tests. Writes land in the same register map, so a read
/// after a write observes the written value.
pub struct SimulatedRegisterTransport {
    state: Mutex<SimulatedRegisterState>,
}

impl SimulatedRegisterTransport {
    pub fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(SimulatedRegisterState {
                rng: StdRng::seed_from_u64(seed),
                registers: HashMap::new(),
                failing: false,
            }),
        }
    }

    /// Preload consecutive registers starting at `address`
    pub fn set_registers(&self, address: u16, words: &[u16]) {
        let mut state = self.state.lock();
        for (i, word) in words.iter().enumerate() {
            state.registers.insert(address + i as u16, *word);
        }
    }

    /// Make every read and write fail until turned off again
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }
}

#[async_trait]
impl RegisterTransport for SimulatedRegisterTransport {
    async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>> {
        let mut state = self.state.lock();
        if state.failing {
            bail!("simulated read failure at address {address}");
        }
        let mut words = Vec::with_capacity(count as usize);
        for i in 0..count {
            let reg = address + i;
            let word = if let Some(word) = state.registers.get(&reg).copied() {
                word
            } else {
                let word: u16 = state.rng.gen_range(0..100);
                state.registers.insert(reg, word);
                word
            };
            words.push(word);
        }
        debug!(
            "Simulated read: unit {} address {} count {} -> {:?}",
            unit_id, address, count, words
        );
        Ok(words)
    }

    async fn write_register(&self, address: u16, value: u16, unit_id: u8) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing {
            bail!("simulated write failure at address {address}");
        }
        state.registers.insert(address, value);
        debug!("Simulated write: unit {} address {} = {}", unit_id, address, value);
        Ok(())
    }
}

/// Factory producing one seeded simulated transport per protocol
pub struct SimulatedTransportFactory {
    seed: u64,
}

impl SimulatedTransportFactory {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl TransportFactory for SimulatedTransportFactory {
    async fn create(
        &self,
        protocol: &str,
        config: &crate::config::IndustrialConfig,
    ) -> Result<std::sync::Arc<dyn RegisterTransport>> {
        info!(
            "Opening simulated {} transport for {}:{}",
            protocol, config.host, config.port
        );
        Ok(std::sync::Arc::new(SimulatedRegisterTransport::new(self.seed)))
    }
}

/// One message captured by the simulated broker
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

/// In-process pub/sub double that records everything published through it
pub struct SimulatedPubSub {
    connected: AtomicBool,
    failing: AtomicBool,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<PublishedMessage>>,
}

impl SimulatedPubSub {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Make connect and publish fail until turned off again
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages published so far, observation hook for tests
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }
}

impl Default for SimulatedPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubTransport for SimulatedPubSub {
    async fn connect(&self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("simulated broker refused connection to {host}:{port}");
        }
        info!("Simulated broker connect to {}:{}", host, port);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            bail!("not connected to broker");
        }
        self.subscriptions.lock().push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) || !self.connected.load(Ordering::SeqCst) {
            bail!("not connected to broker");
        }
        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }
}

/// Line transport fed from an in-process frame queue
pub struct SimulatedLineTransport {
    inbound: Mutex<VecDeque<Bytes>>,
    written: Mutex<Vec<Bytes>>,
}

impl SimulatedLineTransport {
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
        }
    }

    /// Queue a frame for the next `read_line`
    pub fn push_frame(&self, frame: impl Into<Bytes>) {
        self.inbound.lock().push_back(frame.into());
    }

    pub fn written(&self) -> Vec<Bytes> {
        self.written.lock().clone()
    }
}

impl Default for SimulatedLineTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineTransport for SimulatedLineTransport {
    async fn read_line(&self, timeout: Duration) -> Result<Option<Bytes>> {
        if let Some(frame) = self.inbound.lock().pop_front() {
            return Ok(Some(frame));
        }
        // Nothing queued; model the receive timeout
        tokio::time::sleep(timeout).await;
        Ok(self.inbound.lock().pop_front())
    }

    async fn write_line(&self, frame: &[u8]) -> Result<()> {
        self.written.lock().push(Bytes::copy_from_slice(frame));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_registers_read_after_write() {
        let transport = SimulatedRegisterTransport::new(7);
        transport.write_register(100, 1234, 1).await.unwrap();
        let words = transport.read_holding_registers(100, 1, 1).await.unwrap();
        assert_eq!(words, vec![1234]);
    }

    #[tokio::test]
    async fn test_simulated_registers_are_stable_between_reads() {
        let transport = SimulatedRegisterTransport::new(7);
        let first = transport.read_holding_registers(10, 2, 1).await.unwrap();
        let second = transport.read_holding_registers(10, 2, 1).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_simulated_register_failure_mode() {
        let transport = SimulatedRegisterTransport::new(7);
        transport.set_failing(true);
        assert!(transport.read_holding_registers(0, 1, 1).await.is_err());
        transport.set_failing(false);
        assert!(transport.read_holding_registers(0, 1, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_pubsub_requires_connect() {
        let pubsub = SimulatedPubSub::new();
        assert!(pubsub.publish("t", b"x", 0, false).await.is_err());

        pubsub
            .connect("localhost", 1883, Duration::from_secs(1))
            .await
            .unwrap();
        pubsub.publish("t", b"x", 0, false).await.unwrap();
        assert_eq!(pubsub.published().len(), 1);
        assert_eq!(pubsub.published()[0].topic, "t");
    }

    #[tokio::test]
    async fn test_line_transport_queue() {
        let line = SimulatedLineTransport::new();
        line.push_frame(&b"{\"temp\": 20}"[..]);

        let frame = line.read_line(Duration::from_millis(10)).await.unwrap();
        assert_eq!(frame, Some(Bytes::from_static(b"{\"temp\": 20}")));

        // Queue drained; a read returns None after the timeout
        let frame = line.read_line(Duration::from_millis(10)).await.unwrap();
        assert_eq!(frame, None);
    }
}
