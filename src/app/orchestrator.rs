use super::types::{ComponentState, ShutdownReason};
use crate::analyzer::{BackgroundModel, MotionClassifier};
use crate::camera::{open_frame_source, FrameSource};
use crate::capture::{CaptureControl, CaptureHandle, CaptureLoop, CaptureStats};
use crate::config::HomecamConfig;
use crate::error::{HomecamError, Result};
use crate::frame_buffer::FrameBuffer;
use crate::notify::{spawn_notification_worker, NotificationStats, Notifier, TelegramNotifier};
use crate::recording::{default_sink_factory, RecordingController, RecordingSettings, VideoSinkFactory};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Main application coordinator that owns every component's lifecycle
pub struct HomecamOrchestrator {
    pub(super) config: HomecamConfig,

    // Components
    pub(super) capture_loop: Option<CaptureLoop>,
    pub(super) capture_handle: Option<CaptureHandle>,
    pub(super) capture_worker: Option<JoinHandle<CaptureStats>>,
    pub(super) notification_worker: Option<JoinHandle<NotificationStats>>,
    #[cfg(feature = "streaming")]
    pub(super) server_task: Option<JoinHandle<()>>,
    #[cfg(feature = "streaming")]
    pub(super) server_address: Option<std::net::SocketAddr>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
}

impl HomecamOrchestrator {
    /// Open the configured camera and video encoder and wire everything up.
    /// Fails if the camera cannot be opened.
    pub async fn new(config: HomecamConfig) -> Result<Self> {
        let camera_config = config.camera.clone();
        let source = tokio::task::spawn_blocking(move || open_frame_source(camera_config))
            .await
            .map_err(|e| HomecamError::component("camera".to_string(), e.to_string()))??;

        Self::with_components(config, source, default_sink_factory()).await
    }

    /// Build the system around an already opened frame source and writer factory
    pub async fn with_components(
        config: HomecamConfig,
        source: Box<dyn FrameSource>,
        sink_factory: Box<dyn VideoSinkFactory>,
    ) -> Result<Self> {
        ensure_dir(Path::new(&config.recording.photos_dir)).await?;
        ensure_dir(Path::new(&config.recording.videos_dir)).await?;

        let (notifier, notification_worker) = Self::start_notifier(&config);

        let controller = RecordingController::new(
            RecordingSettings::from_config(&config),
            sink_factory,
            notifier,
        );

        let capture_loop = CaptureLoop::new(
            source,
            BackgroundModel::from_config(&config.motion),
            MotionClassifier::from_config(&config.motion),
            controller,
            FrameBuffer::new(),
            CaptureControl::new(),
        )
        .with_fps(config.camera.fps);

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let mut states = HashMap::new();
        for component in ["camera", "capture", "notifier", "streaming"] {
            states.insert(component.to_string(), ComponentState::Stopped);
        }

        Ok(Self {
            config,
            capture_loop: Some(capture_loop),
            capture_handle: None,
            capture_worker: None,
            notification_worker,
            #[cfg(feature = "streaming")]
            server_task: None,
            #[cfg(feature = "streaming")]
            server_address: None,
            component_states: Arc::new(Mutex::new(states)),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
        })
    }

    fn start_notifier(
        config: &HomecamConfig,
    ) -> (Notifier, Option<JoinHandle<NotificationStats>>) {
        let telegram = TelegramNotifier::new(&config.notifier);
        if !telegram.is_configured() {
            return (Notifier::disabled(), None);
        }

        let (notifier, worker) = spawn_notification_worker(Arc::new(telegram));
        (notifier, Some(worker))
    }

    pub fn config(&self) -> &HomecamConfig {
        &self.config
    }

    /// Handle to the running capture loop, available after `start`
    pub fn capture_handle(&self) -> Option<CaptureHandle> {
        self.capture_handle.clone()
    }

    /// Address the stream server is listening on, available after `start`
    #[cfg(feature = "streaming")]
    pub fn server_address(&self) -> Option<std::net::SocketAddr> {
        self.server_address
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            warn!("Failed to create {}: {}", dir.display(), e);
            e
        })?;
        info!("Created directory: {}", dir.display());
    }
    Ok(())
}
