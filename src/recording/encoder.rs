use super::writer::{VideoSink, VideoSinkFactory, FINALIZE_TIMEOUT};
use crate::error::{RecordingError, Result};
use crate::frame::Frame;
use gstreamer::prelude::*;
use gstreamer::{ClockTime, Pipeline};
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Opens H.264/MP4 files through a GStreamer software encoding pipeline
#[derive(Debug, Default)]
pub struct GstVideoSinkFactory;

impl GstVideoSinkFactory {
    pub fn new() -> Self {
        Self
    }
}

impl VideoSinkFactory for GstVideoSinkFactory {
    fn open(&self, path: &Path, resolution: (u32, u32), fps: u32) -> Result<Box<dyn VideoSink>> {
        Ok(Box::new(GstVideoSink::open(path, resolution, fps)?))
    }
}

/// One MP4 file being encoded from raw RGB frames
pub struct GstVideoSink {
    pipeline: Pipeline,
    appsrc: AppSrc,
    path: PathBuf,
    resolution: (u32, u32),
    frame_duration: ClockTime,
    frames_written: u64,
}

impl GstVideoSink {
    pub fn open(path: &Path, resolution: (u32, u32), fps: u32) -> Result<Self> {
        let open_error = |details: String| RecordingError::WriterOpen {
            path: path.display().to_string(),
            details,
        };

        gstreamer::init().map_err(|e| open_error(format!("Failed to initialize GStreamer: {}", e)))?;

        let (width, height) = resolution;
        let fps = fps.max(1);
        let pipeline_desc = format!(
            "appsrc name=src format=time is-live=false block=false max-bytes=0 \
             caps=video/x-raw,format=RGB,width={width},height={height},framerate={fps}/1 ! \
             videoconvert ! video/x-raw,format=I420 ! \
             x264enc speed-preset=ultrafast tune=zerolatency key-int-max={keyint} ! \
             h264parse ! \
             mp4mux faststart=true ! \
             filesink name=sink",
            keyint = fps * 2,
        );
        debug!("Video pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| open_error(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| open_error("Failed to downcast to Pipeline".to_string()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| open_error("Failed to get appsrc element".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| open_error("Failed to downcast to AppSrc".to_string()))?;

        let filesink = pipeline
            .by_name("sink")
            .ok_or_else(|| open_error("Failed to get filesink element".to_string()))?;
        filesink.set_property("location", path.to_string_lossy().to_string());

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gstreamer::State::Null);
            open_error(format!("Failed to start pipeline: {}", e))
        })?;

        info!(
            "Opened video writer {} ({}x{} @ {} fps)",
            path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            pipeline,
            appsrc,
            path: path.to_path_buf(),
            resolution,
            frame_duration: ClockTime::from_nseconds(1_000_000_000 / fps as u64),
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn wait_for_eos(&self) -> Result<()> {
        let finalize_error = |details: String| RecordingError::Finalize {
            path: self.path.display().to_string(),
            details,
        };

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| finalize_error("Pipeline has no bus".to_string()))?;

        for msg in bus.iter_timed(ClockTime::from_seconds(FINALIZE_TIMEOUT.as_secs())) {
            match msg.view() {
                gstreamer::MessageView::Eos(..) => return Ok(()),
                gstreamer::MessageView::Error(err) => {
                    return Err(finalize_error(format!(
                        "{} ({})",
                        err.error(),
                        err.debug().unwrap_or_default()
                    ))
                    .into());
                }
                _ => {}
            }
        }

        Err(finalize_error(format!(
            "No end-of-stream within {:?}",
            FINALIZE_TIMEOUT
        ))
        .into())
    }
}

impl VideoSink for GstVideoSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != self.resolution {
            return Err(RecordingError::WriteFailed {
                details: format!(
                    "Frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.resolution.0,
                    self.resolution.1
                ),
            }
            .into());
        }

        let mut buffer = gstreamer::Buffer::from_slice(frame.as_raw().to_vec());
        if let Some(buffer_ref) = buffer.get_mut() {
            let pts = self.frame_duration.nseconds() * self.frames_written;
            buffer_ref.set_pts(ClockTime::from_nseconds(pts));
            buffer_ref.set_duration(self.frame_duration);
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| RecordingError::WriteFailed {
                details: format!("Failed to push buffer: {:?}", e),
            })?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let eos_result = match self.appsrc.end_of_stream() {
            Ok(_) => self.wait_for_eos(),
            Err(e) => Err(RecordingError::Finalize {
                path: self.path.display().to_string(),
                details: format!("Failed to signal EOS: {:?}", e),
            }
            .into()),
        };

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop video pipeline for {}: {}", self.path.display(), e);
        }

        eos_result?;
        info!(
            "Finalized video {} ({} frames)",
            self.path.display(),
            self.frames_written
        );
        Ok(())
    }
}

impl Drop for GstVideoSink {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
