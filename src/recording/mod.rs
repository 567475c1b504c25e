mod controller;
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
mod encoder;
mod naming;
mod snapshot;
mod writer;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use controller::{
    NotificationMessages, RecordingController, RecordingSession, RecordingSettings,
    RecordingState, Transition,
};
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
pub use encoder::{GstVideoSink, GstVideoSinkFactory};
pub use naming::{file_stamp, resolve_timezone};
pub use snapshot::save_snapshot;
pub use writer::{default_sink_factory, VideoSink, VideoSinkFactory, FINALIZE_TIMEOUT};
