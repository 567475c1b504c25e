use super::{ComponentState, HomecamOrchestrator};
use crate::capture::spawn_capture;
use crate::error::{HomecamError, Result};
use tracing::info;

impl HomecamOrchestrator {
    /// Start the capture worker and, when built with streaming, the HTTP server
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Homecam system");

        let capture_loop = self
            .capture_loop
            .take()
            .ok_or_else(|| HomecamError::system("System already started"))?;

        self.set_component_state("camera", ComponentState::Running)
            .await;

        self.set_component_state("capture", ComponentState::Starting)
            .await;
        let (handle, worker) = spawn_capture(capture_loop);
        self.capture_handle = Some(handle.clone());
        self.capture_worker = Some(worker);
        self.set_component_state("capture", ComponentState::Running)
            .await;
        info!("Capture loop started at {} fps", self.config.camera.fps);

        if self.notification_worker.is_some() {
            self.set_component_state("notifier", ComponentState::Running)
                .await;
            info!("Telegram notifications enabled");
        } else {
            info!("Telegram credentials not configured; notifications disabled");
        }

        #[cfg(feature = "streaming")]
        self.start_stream_server(handle).await?;

        info!("Homecam system started successfully");
        Ok(())
    }

    #[cfg(feature = "streaming")]
    async fn start_stream_server(&mut self, capture: crate::capture::CaptureHandle) -> Result<()> {
        use crate::streaming::StreamServerBuilder;
        use tracing::error;

        self.set_component_state("streaming", ComponentState::Starting)
            .await;

        let server = StreamServerBuilder::new()
            .from_homecam_config(&self.config)
            .capture(capture)
            .build()?;

        let listener = match server.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                self.set_component_state("streaming", ComponentState::Failed)
                    .await;
                error!("Failed to start stream server: {}", e);
                return Err(e);
            }
        };
        self.server_address = listener.local_addr().ok();

        self.server_task = Some(tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                error!("Stream server error: {}", e);
            }
        }));

        self.set_component_state("streaming", ComponentState::Running)
            .await;
        Ok(())
    }
}
