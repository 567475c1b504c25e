use super::{ComponentState, HomecamOrchestrator};
use crate::error::{HomecamError, Result};
use crate::recording::FINALIZE_TIMEOUT;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Slack for the cycle in flight when the stop arrives
const CAPTURE_STOP_MARGIN: Duration = Duration::from_secs(5);
const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// How long the capture worker may take to stop: one blocked camera read,
/// finalizing the open video, and the cycle in flight
pub(super) fn capture_stop_timeout(read_timeout_ms: u64) -> Duration {
    Duration::from_millis(read_timeout_ms) + FINALIZE_TIMEOUT + CAPTURE_STOP_MARGIN
}

impl HomecamOrchestrator {
    /// Stop every component; a non-zero exit code means something did not stop cleanly
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        if let Err(e) = self.stop_capture().await {
            error!("Error stopping capture: {}", e);
            exit_code = 1;
        }

        #[cfg(feature = "streaming")]
        self.stop_stream_server().await;

        self.stop_notifier().await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop capture and wait for the worker to close the session and camera
    async fn stop_capture(&mut self) -> Result<()> {
        let Some(worker) = self.capture_worker.take() else {
            self.set_component_state("capture", ComponentState::Stopped)
                .await;
            return Ok(());
        };

        self.set_component_state("capture", ComponentState::Stopping)
            .await;
        if let Some(handle) = &self.capture_handle {
            handle.stop();
        }

        let stop_timeout = capture_stop_timeout(self.config.camera.read_timeout_ms);
        match timeout(stop_timeout, worker).await {
            Ok(Ok(stats)) => {
                self.set_component_state("capture", ComponentState::Stopped)
                    .await;
                self.set_component_state("camera", ComponentState::Stopped)
                    .await;
                info!(
                    "Capture stopped after {} cycles ({} recording sessions)",
                    stats.cycles, stats.sessions_started
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state("capture", ComponentState::Failed)
                    .await;
                Err(HomecamError::component(
                    "capture".to_string(),
                    format!("worker panicked: {}", e),
                ))
            }
            Err(_) => {
                self.set_component_state("capture", ComponentState::Failed)
                    .await;
                Err(HomecamError::component(
                    "capture".to_string(),
                    "stop timeout".to_string(),
                ))
            }
        }
    }

    #[cfg(feature = "streaming")]
    async fn stop_stream_server(&mut self) {
        if let Some(task) = self.server_task.take() {
            self.set_component_state("streaming", ComponentState::Stopping)
                .await;
            task.abort();
            let _ = task.await;
            info!("Stream server stopped");
        }
        self.set_component_state("streaming", ComponentState::Stopped)
            .await;
    }

    /// Let queued notifications go out; the worker ends once the recording
    /// controller, and with it the last sender, is gone
    async fn stop_notifier(&mut self) {
        drop(self.capture_loop.take());
        if let Some(worker) = self.notification_worker.take() {
            self.set_component_state("notifier", ComponentState::Stopping)
                .await;
            match timeout(NOTIFIER_DRAIN_TIMEOUT, worker).await {
                Ok(Ok(stats)) => info!(
                    "Notifier stopped ({} delivered, {} failed)",
                    stats.delivered, stats.failed
                ),
                Ok(Err(e)) => warn!("Notification worker panicked: {}", e),
                Err(_) => warn!("Timed out delivering pending notifications"),
            }
        }
        self.set_component_state("notifier", ComponentState::Stopped)
            .await;
    }
}
