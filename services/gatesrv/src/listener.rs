//! Mesh inbound listener
//!
//! Continuously drains a line transport (LoRa serial and similar) and hands
//! every frame to the router. Frames arrive unsolicited, so the loop polls
//! on a short timeout and reacts to cancellation between reads.

use crate::transport::LineTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unigate_routing::MessageRouter;

pub struct MeshListener {
    transport: Arc<dyn LineTransport>,
    router: Arc<MessageRouter>,
    protocol: String,
    poll_interval: Duration,
}

impl MeshListener {
    pub fn new(
        transport: Arc<dyn LineTransport>,
        router: Arc<MessageRouter>,
        protocol: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            router,
            protocol: protocol.into(),
            poll_interval,
        }
    }

    /// Listen until cancelled
    pub async fn run(&self, token: CancellationToken) {
        info!("Mesh listener started for {}", self.protocol);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                result = self.transport.read_line(self.poll_interval) => match result {
                    Ok(Some(frame)) => {
                        debug!("Mesh frame on {}: {} bytes", self.protocol, frame.len());
                        self.router.dispatch(&self.protocol, &frame).await;
                    },
                    Ok(None) => {},
                    Err(e) => {
                        warn!("Mesh read on {} failed: {}", self.protocol, e);
                        sleep(self.poll_interval).await;
                    },
                },
            }
        }
        info!("Mesh listener stopped for {}", self.protocol);
    }
}
