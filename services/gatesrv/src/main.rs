//! Gateway agent entry point

use clap::Parser;
use gatesrv::lifecycle::{Agent, AgentContext};
use gatesrv::transport::{SimulatedLineTransport, SimulatedPubSub, SimulatedTransportFactory};
use gatesrv::AgentConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gatesrv", about = "Unified gateway agent")]
struct Args {
    /// Path to the settings file (YAML or JSON)
    #[arg(short, long, env = "UNIGATE_CONFIG", default_value = "config/settings.yaml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, env = "UNIGATE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AgentConfig::load(&args.config)?;
    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    common::init_logging(level)?;
    info!("Configuration loaded from {}", args.config.display());

    let ctx = Arc::new(AgentContext::build(config)?);
    let agent = Agent::start(
        ctx,
        Arc::new(SimulatedTransportFactory::new(rand::random())),
        Arc::new(SimulatedPubSub::new()),
        Arc::new(SimulatedLineTransport::new()),
    )
    .await?;

    common::wait_for_shutdown().await;

    if let Err(e) = agent.shutdown().await {
        error!("Shutdown completed with failures: {}", e);
    }
    Ok(())
}
