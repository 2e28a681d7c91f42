//! Interrupt handling
//!
//! An interrupt ends sampling gracefully: the loop stops at its next
//! suspension point and everything collected so far is kept.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancellation shared between the signal listener and the sampling loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that monitoring stop.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Spawn a task that triggers this signal on the first SIGINT or SIGTERM.
    ///
    /// Later interrupts are absorbed by the installed handler, so the
    /// monitor still gets to write its results.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = wait_for_interrupt() => {
                    if let Err(e) = result {
                        warn!("Cannot listen for interrupts: {}", e);
                        return;
                    }
                    signal.trigger();
                }
                _ = signal.triggered() => {}
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, stopping monitoring");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, stopping monitoring");
        }
    }

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, stopping monitoring");
    Ok(())
}
