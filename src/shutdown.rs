//! Cooperative shutdown coordination.
//!
//! A single cancellation token is shared between the signal task and the
//! acquisition loop. Requesting shutdown is idempotent; the flag only ever
//! transitions false → true. The loop polls it once per iteration, which is
//! the cancellation granularity — there is no forced preemption and no
//! timeout, because iterations are sub-second.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Externally-triggered cooperative shutdown flag plus the signal wiring
/// that sets it.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown flag. Safe to call any number of times; only the
    /// first call has an observable effect.
    pub fn request_shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Shutdown requested");
        }
        self.token.cancel();
    }

    /// Cheap, non-blocking check polled once per loop iteration.
    pub fn is_shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested. Used in `select!` arms so
    /// the pacing sleep does not delay observation.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Spawn the signal task: SIGINT and SIGTERM both request shutdown.
    /// No other signal is handled.
    pub fn install_signal_handlers(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            wait_for_termination_signal().await;
            coordinator.request_shutdown();
        });
    }
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler; falling back to Ctrl+C only");
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, initiating shutdown...");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Received Ctrl+C, initiating shutdown...");
}
