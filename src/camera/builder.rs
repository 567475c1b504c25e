use super::source::FrameSource;
use crate::config::CameraConfig;
use crate::error::{HomecamError, Result};

/// Builder for the platform camera source
pub struct FrameSourceBuilder {
    config: Option<CameraConfig>,
}

impl FrameSourceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Box<dyn FrameSource>> {
        let config = self
            .config
            .ok_or_else(|| HomecamError::system("Camera configuration must be specified"))?;

        open_frame_source(config)
    }
}

impl Default for FrameSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the configured camera device
#[cfg(all(target_os = "linux", feature = "camera"))]
pub fn open_frame_source(config: CameraConfig) -> Result<Box<dyn FrameSource>> {
    let source = super::interface::GstFrameSource::open(config)?;
    Ok(Box::new(source))
}

/// Without GStreamer capture, fall back to a synthetic static scene
#[cfg(not(all(target_os = "linux", feature = "camera")))]
pub fn open_frame_source(config: CameraConfig) -> Result<Box<dyn FrameSource>> {
    tracing::warn!(
        "Camera capture is only available on Linux with the camera feature; using synthetic source"
    );
    let (width, height) = config.resolution;
    Ok(Box::new(super::synthetic::SyntheticSource::new(width, height)))
}
