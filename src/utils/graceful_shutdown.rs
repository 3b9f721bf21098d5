use eyre::{Result, WrapErr};
use tokio::{signal, sync::watch};

/// Shutdown latch shared by the server and its background tasks.
///
/// Once triggered it stays triggered; late subscribers see it immediately.
#[derive(Clone)]
pub struct GracefulShutdown {
    tx: watch::Sender<bool>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        *self.tx.borrow()
    }

    /// Request shutdown. Repeated calls are ignored.
    pub fn trigger_shutdown(&self) {
        let first = self.tx.send_if_modified(|initiated| {
            let was = *initiated;
            *initiated = true;
            !was
        });
        if first {
            tracing::info!("Shutdown initiated");
        }
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait_for_shutdown_signal(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|initiated| *initiated).await;
    }

    /// Listen for SIGINT / SIGTERM and trigger shutdown on the first one.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started. Listening for SIGTERM and SIGINT");

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to listen for SIGINT")?;
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            result = wait_for_sigterm() => {
                result?;
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        self.trigger_shutdown();
        Ok(())
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("Failed to register SIGTERM handler")?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    // On non-Unix systems, we only have Ctrl+C
    std::future::pending::<()>().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_graceful_shutdown_creation() {
        let shutdown = GracefulShutdown::new();
        assert!(!shutdown.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_trigger_wakes_waiters() {
        let shutdown = GracefulShutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait_for_shutdown_signal().await })
        };

        shutdown.trigger_shutdown();
        shutdown.trigger_shutdown();

        assert!(shutdown.is_shutdown_initiated());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_late_waiter_returns_immediately() {
        let shutdown = GracefulShutdown::new();
        shutdown.trigger_shutdown();

        tokio::time::timeout(Duration::from_secs(1), shutdown.wait_for_shutdown_signal())
            .await
            .expect("already triggered");
    }
}
