pub mod analyzer;
pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod frame_buffer;
pub mod notify;
pub mod recording;

#[cfg(feature = "streaming")]
pub mod streaming;

pub use analyzer::{BackgroundModel, MotionClassifier, MotionRegion, MotionVerdict};
pub use app::{ComponentState, HomecamOrchestrator, ShutdownReason};
pub use camera::{open_frame_source, FrameSource, SyntheticSource};
pub use capture::{spawn_capture, CaptureHandle, CaptureLoop, CaptureState, CaptureStats};
pub use config::HomecamConfig;
pub use error::{HomecamError, Result};
pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use notify::{Notifier, NotificationSink, TelegramNotifier};
pub use recording::{RecordingController, RecordingSettings, RecordingState, Transition};

#[cfg(feature = "streaming")]
pub use streaming::{StreamServer, StreamServerBuilder, StreamStats};
