use crate::{
    capture::CaptureHandle,
    config::{HomecamConfig, StreamConfig},
    error::{HomecamError, Result, StreamError},
};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tower_http::services::ServeDir;
use tracing::info;

use super::handlers::{
    health_handler, index_handler, media_handler, mjpeg_stream_handler, shutdown_handler,
};
use super::stats::StreamStats;

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) capture: CaptureHandle,
    pub(crate) stats: Arc<StreamStats>,
    pub(crate) target_frame_interval: Duration,
    pub(crate) photos_dir: PathBuf,
    pub(crate) videos_dir: PathBuf,
    pub(crate) recent_photos: usize,
    pub(crate) recent_videos: usize,
}

/// HTTP server for the live MJPEG stream and recorded media
pub struct StreamServer {
    pub(crate) config: StreamConfig,
    pub(crate) state: ServerState,
}

impl StreamServer {
    pub fn new(
        config: StreamConfig,
        capture: CaptureHandle,
        photos_dir: PathBuf,
        videos_dir: PathBuf,
    ) -> Self {
        let target_frame_interval = Duration::from_micros(1_000_000u64 / config.fps.max(1) as u64);

        let state = ServerState {
            capture,
            stats: Arc::new(StreamStats::default()),
            target_frame_interval,
            photos_dir,
            videos_dir,
            recent_photos: config.recent_photos,
            recent_videos: config.recent_videos,
        };

        Self { config, state }
    }

    pub fn stats(&self) -> Arc<StreamStats> {
        Arc::clone(&self.state.stats)
    }

    /// Configured bind address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/stream.mjpg", get(mjpeg_stream_handler))
            .route("/health", get(health_handler))
            .route("/media", get(media_handler))
            .route("/shutdown", post(shutdown_handler))
            .nest_service("/photos", ServeDir::new(&self.state.photos_dir))
            .nest_service("/videos", ServeDir::new(&self.state.videos_dir))
            .with_state(self.state.clone())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| StreamError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        let local: Option<SocketAddr> = listener.local_addr().ok();
        info!(
            "Stream server listening on {}",
            local.map(|a| a.to_string()).unwrap_or(addr)
        );
        Ok(listener)
    }

    /// Serve on an already bound listener until the task is aborted
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router())
            .await
            .map_err(|e| StreamError::StartupFailed {
                details: format!("Server error: {}", e),
            })?;

        Ok(())
    }

    /// Bind and serve
    pub async fn start(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}

/// Stream server builder for configuration
pub struct StreamServerBuilder {
    config: Option<StreamConfig>,
    capture: Option<CaptureHandle>,
    photos_dir: Option<PathBuf>,
    videos_dir: Option<PathBuf>,
}

impl StreamServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            capture: None,
            photos_dir: None,
            videos_dir: None,
        }
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Take stream settings and media directories from the full configuration
    pub fn from_homecam_config(self, config: &HomecamConfig) -> Self {
        self.config(config.stream.clone())
            .media_dirs(&config.recording.photos_dir, &config.recording.videos_dir)
    }

    pub fn capture(mut self, capture: CaptureHandle) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn media_dirs<P: Into<PathBuf>>(mut self, photos_dir: P, videos_dir: P) -> Self {
        self.photos_dir = Some(photos_dir.into());
        self.videos_dir = Some(videos_dir.into());
        self
    }

    pub fn build(self) -> Result<StreamServer> {
        let missing = |what: &str| {
            HomecamError::Stream(StreamError::StartupFailed {
                details: format!("{} is required", what),
            })
        };

        let config = self.config.ok_or_else(|| missing("Stream configuration"))?;
        let capture = self.capture.ok_or_else(|| missing("Capture handle"))?;
        let photos_dir = self.photos_dir.ok_or_else(|| missing("Photos directory"))?;
        let videos_dir = self.videos_dir.ok_or_else(|| missing("Videos directory"))?;

        Ok(StreamServer::new(config, capture, photos_dir, videos_dir))
    }
}

impl Default for StreamServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
