//! Agent assembly and lifecycle
//!
//! Builds the shared component graph from configuration, starts the
//! background acquisition tasks, and tears everything down cooperatively on
//! shutdown. Degraded startup is deliberate: a broker or field bus that
//! fails to come up is logged and the rest of the agent keeps running.

use crate::backup::BackupWriter;
use crate::config::{AgentConfig, StorageBackend};
use crate::handlers::{MeshForwarder, PubSubForwarder, TelemetryCollector, ThresholdAlerter};
use crate::listener::MeshListener;
use crate::poller::RegisterPoller;
use crate::registry::ConnectionRegistry;
use crate::transport::{LineTransport, PubSubTransport, TransportFactory};
use errors::{GatewayError, GatewayResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use unigate_analytics::{AlertLog, AnalyticsEngine};
use unigate_routing::MessageRouter;
use unigate_telemetry::{FileStore, MemoryStore, SystemTimeProvider, TelemetryStore, TimeProvider};

/// Shared component graph, built once from configuration
pub struct AgentContext {
    pub config: AgentConfig,
    pub time: Arc<dyn TimeProvider>,
    pub store: Arc<dyn TelemetryStore>,
    pub router: Arc<MessageRouter>,
    pub registry: Arc<ConnectionRegistry>,
    pub analytics: Arc<AnalyticsEngine>,
    pub alerts: Arc<AlertLog>,
    pub backups: Arc<BackupWriter>,
}

impl AgentContext {
    pub fn build(config: AgentConfig) -> GatewayResult<Self> {
        Self::build_with_time_provider(config, Arc::new(SystemTimeProvider))
    }

    pub fn build_with_time_provider(
        config: AgentConfig,
        time: Arc<dyn TimeProvider>,
    ) -> GatewayResult<Self> {
        config.validate()?;

        let store: Arc<dyn TelemetryStore> = match config.monitoring.data_storage {
            StorageBackend::Memory => {
                Arc::new(MemoryStore::with_time_provider(time.clone()))
            },
            StorageBackend::File => Arc::new(
                FileStore::open_with_time_provider(&config.monitoring.storage_path, time.clone())
                    .map_err(|e| GatewayError::Storage(e.to_string()))?,
            ),
        };
        info!(
            "Telemetry store: {:?} ({})",
            config.monitoring.data_storage, config.monitoring.storage_path
        );

        let analytics = Arc::new(AnalyticsEngine::with_time_provider(
            store.clone(),
            time.clone(),
        ));
        let alerts = Arc::new(AlertLog::with_time_provider(time.clone()));
        let backups = Arc::new(BackupWriter::new(&config.business.backup_storage, time.clone()));

        Ok(Self {
            config,
            time,
            store,
            router: Arc::new(MessageRouter::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            analytics,
            alerts,
            backups,
        })
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.max_age_secs)
    }
}

/// Running agent with its background tasks
pub struct Agent {
    ctx: Arc<AgentContext>,
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Agent {
    /// Bring the agent up: open connections, register handlers, spawn the
    /// acquisition tasks
    pub async fn start(
        ctx: Arc<AgentContext>,
        factory: Arc<dyn TransportFactory>,
        pubsub: Arc<dyn PubSubTransport>,
        mesh: Arc<dyn LineTransport>,
    ) -> GatewayResult<Self> {
        let token = CancellationToken::new();
        let mut tasks = Vec::new();

        let broker_up = Self::connect_broker(&ctx, pubsub.as_ref()).await;
        Self::register_handlers(&ctx, &pubsub, &mesh, broker_up);

        if ctx.config.industrial.enabled {
            ctx.registry
                .open_all(&ctx.config.industrial, factory.as_ref())
                .await;
            let poller = RegisterPoller::new(
                ctx.registry.clone(),
                ctx.router.clone(),
                ctx.store.clone(),
                ctx.time.clone(),
                ctx.config.industrial.clone(),
                ctx.cache_ttl(),
            );
            let poll_token = token.clone();
            tasks.push(tokio::spawn(async move { poller.run(poll_token).await }));
        }

        if ctx.config.mesh.enabled {
            for protocol in &ctx.config.mesh.protocols {
                let listener = MeshListener::new(
                    mesh.clone(),
                    ctx.router.clone(),
                    protocol.clone(),
                    Duration::from_millis(ctx.config.mesh.poll_interval_ms),
                );
                let listen_token = token.clone();
                tasks.push(tokio::spawn(async move { listener.run(listen_token).await }));
            }
        }

        info!("Agent started ({} background tasks)", tasks.len());
        Ok(Self { ctx, token, tasks })
    }

    /// Connect and subscribe the broker, degrading on failure
    async fn connect_broker(ctx: &AgentContext, pubsub: &dyn PubSubTransport) -> bool {
        let integrations = &ctx.config.integrations;
        if !integrations.enabled {
            return false;
        }
        let timeout = Duration::from_secs(integrations.connect_timeout_secs);
        if let Err(e) = pubsub
            .connect(&integrations.host, integrations.port, timeout)
            .await
        {
            warn!(
                "Broker {}:{} unavailable, continuing without forwarding: {:#}",
                integrations.host, integrations.port, e
            );
            return false;
        }
        for topic in &integrations.topics {
            if let Err(e) = pubsub.subscribe(topic).await {
                warn!("Subscribe to {} failed: {:#}", topic, e);
            }
        }
        true
    }

    /// Attach the built-in handlers to every active protocol
    fn register_handlers(
        ctx: &AgentContext,
        pubsub: &Arc<dyn PubSubTransport>,
        mesh: &Arc<dyn LineTransport>,
        broker_up: bool,
    ) {
        let mut alerter =
            ThresholdAlerter::new(ctx.alerts.clone(), &ctx.config.monitoring.thresholds);
        if broker_up {
            alerter = alerter.with_pubsub(pubsub.clone());
        }
        let alerter = Arc::new(alerter);
        let forwarder = Arc::new(PubSubForwarder::new(
            pubsub.clone(),
            ctx.config.integrations.topic_prefix.clone(),
        ));
        let collector = Arc::new(TelemetryCollector::new(
            ctx.store.clone(),
            ctx.time.clone(),
            ctx.cache_ttl(),
        ));

        // Poller output is already stored before dispatch; only mesh frames
        // need the collector. Polled readings also go out over the mesh link
        // when one is active.
        if ctx.config.industrial.enabled {
            let mesh_forwarder = Arc::new(MeshForwarder::new(mesh.clone()));
            for protocol in &ctx.config.industrial.protocols {
                if ctx.config.monitoring.enabled {
                    ctx.router.register(protocol, alerter.clone());
                }
                if broker_up {
                    ctx.router.register(protocol, forwarder.clone());
                }
                if ctx.config.mesh.enabled {
                    ctx.router.register(protocol, mesh_forwarder.clone());
                }
            }
        }
        if ctx.config.mesh.enabled {
            for protocol in &ctx.config.mesh.protocols {
                ctx.router.register(protocol, collector.clone());
                if ctx.config.monitoring.enabled {
                    ctx.router.register(protocol, alerter.clone());
                }
                if broker_up {
                    ctx.router.register(protocol, forwarder.clone());
                }
            }
        }
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }

    /// Stop the background tasks and close every component.
    ///
    /// Failures are collected rather than short-circuiting so one stuck
    /// component cannot prevent the rest from closing.
    pub async fn shutdown(mut self) -> GatewayResult<()> {
        info!("Agent shutting down");
        self.token.cancel();

        let mut failures = Vec::new();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                failures.push(format!("task join: {e}"));
            }
        }

        if self.ctx.config.business.enabled {
            if let Err(e) = self.write_shutdown_backup().await {
                failures.push(format!("final backup: {e}"));
            }
        }

        self.ctx.registry.close_all();

        if failures.is_empty() {
            info!("Agent stopped cleanly");
            Ok(())
        } else {
            for failure in &failures {
                error!("Shutdown failure: {}", failure);
            }
            Err(GatewayError::ShutdownError(failures.join("; ")))
        }
    }

    /// Snapshot the day's report into the backup directory
    async fn write_shutdown_backup(&self) -> GatewayResult<()> {
        let report = self
            .ctx
            .analytics
            .daily_report(self.ctx.alerts.as_ref())
            .await
            .map_err(|e| GatewayError::Storage(e.to_string()))?;
        self.ctx
            .backups
            .create_backup("daily_report", &json!(report))?;
        Ok(())
    }
}
