use super::{HomecamOrchestrator, ShutdownReason};
use crate::error::{HomecamError, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

impl HomecamOrchestrator {
    /// Run until a shutdown signal arrives or the capture loop stops,
    /// then shut down and return the process exit code
    pub async fn run(&mut self) -> Result<i32> {
        info!("Homecam system is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| HomecamError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| HomecamError::system("Shutdown receiver already taken"))?;

        let control = self
            .capture_handle
            .as_ref()
            .map(|handle| handle.control().clone())
            .ok_or_else(|| HomecamError::system("System has not been started"))?;

        self.setup_signal_handlers(shutdown_sender);

        let shutdown_reason = tokio::select! {
            reason = shutdown_receiver => reason.map_err(|_| {
                HomecamError::system("Shutdown channel closed unexpectedly")
            })?,
            _ = control.stopped() => ShutdownReason::CaptureStopped,
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Homecam system shutdown complete");
        Ok(exit_code)
    }

    /// Forward SIGTERM and SIGINT into the shutdown channel
    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
