use crate::error::Result;
use crate::frame::Frame;
use std::path::Path;
use std::time::Duration;

/// Upper bound on waiting for a video file to be finalized
pub const FINALIZE_TIMEOUT: Duration = Duration::from_secs(10);

/// An open, append-only video file
pub trait VideoSink: Send {
    /// Append one frame
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the file. Consumes the sink so it can only happen once.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Opens video sinks for new recording sessions
pub trait VideoSinkFactory: Send {
    fn open(&self, path: &Path, resolution: (u32, u32), fps: u32) -> Result<Box<dyn VideoSink>>;
}

/// The platform video writer
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
pub fn default_sink_factory() -> Box<dyn VideoSinkFactory> {
    Box::new(super::encoder::GstVideoSinkFactory::new())
}

#[cfg(not(all(target_os = "linux", feature = "video_encoding")))]
pub fn default_sink_factory() -> Box<dyn VideoSinkFactory> {
    tracing::warn!(
        "Video encoding is only available on Linux with the video_encoding feature; sessions will not write video"
    );
    Box::new(UnavailableSinkFactory)
}

#[cfg(not(all(target_os = "linux", feature = "video_encoding")))]
struct UnavailableSinkFactory;

#[cfg(not(all(target_os = "linux", feature = "video_encoding")))]
impl VideoSinkFactory for UnavailableSinkFactory {
    fn open(&self, path: &Path, _resolution: (u32, u32), _fps: u32) -> Result<Box<dyn VideoSink>> {
        Err(crate::error::RecordingError::WriterOpen {
            path: path.display().to_string(),
            details: "Video encoding not available on this platform".to_string(),
        }
        .into())
    }
}
