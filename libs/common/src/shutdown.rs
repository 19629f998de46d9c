//! Shutdown signal handling
//!
//! The agent runs until the operator or the service manager stops it; this
//! module turns those OS signals into one awaitable point.

use tracing::warn;

/// Wait until a stop signal arrives: Ctrl+C, or SIGTERM where the platform
/// has it. The caller then cancels its background tasks and tears down.
///
/// When the SIGTERM handler cannot be installed the agent still stops on
/// Ctrl+C; the failure is logged rather than propagated so the agent keeps
/// running.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!("SIGTERM handler unavailable ({e}); stopping on Ctrl+C only");
                None
            },
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            () = async {
                match sigterm {
                    Some(mut sig) => {
                        sig.recv().await;
                    },
                    None => std::future::pending().await,
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
