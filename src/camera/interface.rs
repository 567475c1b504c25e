use super::source::{pack_rgb_rows, FrameSource};
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::Frame;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// GStreamer V4L2 camera producing RGB frames at the configured resolution
pub struct GstFrameSource {
    config: CameraConfig,
    pipeline: Option<Pipeline>,
    appsink: Option<AppSink>,
    frame_counter: u64,
}

impl GstFrameSource {
    /// Open the camera and start streaming. Fails with
    /// `CameraError::DeviceUnavailable` when the device cannot be started.
    pub fn open(config: CameraConfig) -> Result<Self> {
        info!(
            "Opening GStreamer camera for device {} ({}x{} @ {}fps)",
            config.index, config.resolution.0, config.resolution.1, config.fps
        );

        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = Self::build_pipeline_string(&config);
        debug!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Failed to get appsink element".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        let unavailable = |details: String| CameraError::DeviceUnavailable {
            index: config.index,
            details,
        };

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(unavailable(format!("Failed to start pipeline: {}", e)).into());
        }

        let (state_result, _, _) = pipeline.state(gstreamer::ClockTime::from_seconds(5));
        if let Err(e) = state_result {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(unavailable(format!("Device did not start: {}", e)).into());
        }

        info!("Camera device {} opened", config.index);

        Ok(Self {
            config,
            pipeline: Some(pipeline),
            appsink: Some(appsink),
            frame_counter: 0,
        })
    }

    /// decodebin accepts both raw and MJPEG device output; scaling happens here
    /// so frames always arrive at the configured size
    fn build_pipeline_string(config: &CameraConfig) -> String {
        let (width, height) = config.resolution;
        format!(
            "v4l2src device=/dev/video{} ! \
             decodebin ! \
             videoconvert ! \
             videoscale ! \
             video/x-raw,format=RGB,width={},height={} ! \
             appsink name=sink sync=false max-buffers=1 drop=true",
            config.index, width, height
        )
    }

    fn sample_to_frame(&mut self, sample: gstreamer::Sample) -> Result<Frame> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::ReadFailed {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::ReadFailed {
            details: "No caps in sample".to_string(),
        })?;

        let video_info = VideoInfo::from_caps(caps).map_err(|e| CameraError::ReadFailed {
            details: format!("Failed to get video info: {}", e),
        })?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;

        let map = buffer.map_readable().map_err(|e| CameraError::ReadFailed {
            details: format!("Failed to map buffer: {}", e),
        })?;

        // RGB rows are padded to 4-byte boundaries
        let image = pack_rgb_rows(map.as_slice(), width, height, stride)?;

        let frame_id = self.frame_counter;
        self.frame_counter += 1;
        trace!("Captured frame {} ({}x{})", frame_id, width, height);

        Ok(Frame::new(frame_id, SystemTime::now(), image))
    }

    /// Number of frames delivered so far
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }
}

impl FrameSource for GstFrameSource {
    fn read(&mut self) -> Result<Frame> {
        let appsink = self.appsink.as_ref().ok_or_else(|| CameraError::ReadFailed {
            details: "Camera is closed".to_string(),
        })?;

        if appsink.is_eos() {
            return Err(CameraError::ReadFailed {
                details: "Camera stream reached end of stream".to_string(),
            }
            .into());
        }

        let timeout = gstreamer::ClockTime::from_mseconds(self.config.read_timeout_ms);
        match appsink.try_pull_sample(timeout) {
            Some(sample) => self.sample_to_frame(sample),
            None => Err(CameraError::ReadFailed {
                details: format!("No frame within {}ms", self.config.read_timeout_ms),
            }
            .into()),
        }
    }

    fn close(&mut self) {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop camera pipeline cleanly: {}", e);
            }
            info!("Camera device {} released", self.config.index);
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.config.resolution
    }

    fn is_open(&self) -> bool {
        self.pipeline.is_some()
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
