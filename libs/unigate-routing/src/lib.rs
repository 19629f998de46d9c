//! Unigate message routing
//!
//! Maintains per-protocol ordered handler lists and dispatches inbound
//! messages to them. A handler failure is logged and skipped; the remaining
//! handlers for the protocol still run, and dispatch never surfaces a
//! handler's error to its caller.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A named message consumer bound to exactly one protocol.
///
/// Handlers are registered once at startup and invoked in registration order
/// on the dispatching task. The router holds them by reference (`Arc`), so a
/// handler may also be shared with other parts of the service.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handler name, used in dispatch failure logs
    fn name(&self) -> &str;

    /// Consume one inbound message.
    ///
    /// Errors are isolated by the router; returning `Err` never affects
    /// sibling handlers or the dispatching caller.
    async fn handle(&self, protocol: &str, message: &Value) -> anyhow::Result<()>;
}

/// Per-protocol ordered handler registry
pub struct MessageRouter {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn MessageHandler>>>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Append a handler to the ordered list for `protocol`, creating the
    /// list if this is the first registration.
    pub fn register(&self, protocol: &str, handler: Arc<dyn MessageHandler>) {
        debug!("Registered handler '{}' for {}", handler.name(), protocol);
        self.handlers
            .write()
            .entry(protocol.to_string())
            .or_default()
            .push(handler);
    }

    /// Number of handlers registered for a protocol
    pub fn handler_count(&self, protocol: &str) -> usize {
        self.handlers
            .read()
            .get(protocol)
            .map_or(0, |list| list.len())
    }

    /// Protocols with at least one registered handler
    pub fn protocols(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Dispatch one raw inbound message to every handler registered for
    /// `protocol`, in registration order, on the calling task.
    ///
    /// The payload is parsed as JSON; a payload that is not valid JSON is
    /// wrapped as `{"raw": "<lossy utf8>"}` rather than failing the dispatch.
    /// Having no handlers for the protocol is not an error.
    pub async fn dispatch(&self, protocol: &str, raw: &[u8]) {
        let message = parse_payload(raw);

        // Snapshot the list so the lock is not held across handler awaits.
        let handlers: Vec<Arc<dyn MessageHandler>> = self
            .handlers
            .read()
            .get(protocol)
            .map(|list| list.clone())
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!("No handlers registered for {}, dropping message", protocol);
            return;
        }

        for handler in handlers {
            if let Err(e) = handler.handle(protocol, &message).await {
                warn!(
                    "Handler '{}' failed for {}: {:#}; continuing with remaining handlers",
                    handler.name(),
                    protocol,
                    e
                );
            }
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a raw payload as JSON, wrapping non-JSON input as `{"raw": ...}`
fn parse_payload(raw: &[u8]) -> Value {
    match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(_) => json!({ "raw": String::from_utf8_lossy(raw) }),
    }
}
