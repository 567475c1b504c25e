use super::naming::{file_stamp, resolve_timezone};
use super::snapshot::save_snapshot;
use super::writer::{VideoSink, VideoSinkFactory};
use crate::config::HomecamConfig;
use crate::frame::Frame;
use crate::notify::Notifier;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Recording state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
        }
    }
}

/// What a single `update` did to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    None,
    Started {
        video_path: PathBuf,
        snapshot_path: Option<PathBuf>,
    },
    Stopped {
        video_path: PathBuf,
        frames_written: u64,
    },
}

#[derive(Debug, Clone)]
pub struct NotificationMessages {
    pub started: String,
    pub ended: String,
    pub photo_caption: String,
}

/// Fixed recording parameters, read once at startup
#[derive(Debug, Clone)]
pub struct RecordingSettings {
    pub hold: Duration,
    pub photos_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub fps: u32,
    pub resolution: (u32, u32),
    pub timezone: Option<Tz>,
    pub messages: NotificationMessages,
}

impl RecordingSettings {
    pub fn from_config(config: &HomecamConfig) -> Self {
        Self {
            hold: Duration::from_secs(config.recording.hold_seconds),
            photos_dir: PathBuf::from(&config.recording.photos_dir),
            videos_dir: PathBuf::from(&config.recording.videos_dir),
            fps: config.recording.video_fps,
            resolution: config.camera.resolution,
            timezone: resolve_timezone(config.recording.timestamp_timezone.as_deref()),
            messages: NotificationMessages {
                started: config.notifier.started_message.clone(),
                ended: config.notifier.ended_message.clone(),
                photo_caption: config.notifier.photo_caption.clone(),
            },
        }
    }
}

/// One continuous motion episode
pub struct RecordingSession {
    pub id: Uuid,
    pub started_at: SystemTime,
    pub video_path: PathBuf,
    pub snapshot_path: Option<PathBuf>,
    writer: Option<Box<dyn VideoSink>>,
    frames_written: u64,
    write_failures: u64,
}

impl RecordingSession {
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    fn append(&mut self, frame: &Frame) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        match writer.write(frame) {
            Ok(()) => self.frames_written += 1,
            Err(e) => {
                self.write_failures += 1;
                if self.write_failures == 1 || self.write_failures % 100 == 0 {
                    error!(
                        "Failed to append frame {} to {} ({} failures): {}",
                        frame.id,
                        self.video_path.display(),
                        self.write_failures,
                        e
                    );
                }
            }
        }
    }

    fn close(mut self) -> u64 {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finish() {
                error!("Failed to finalize {}: {}", self.video_path.display(), e);
            }
        }

        if self.write_failures > 0 {
            warn!(
                "Session {} closed with {} failed frame writes",
                self.id, self.write_failures
            );
        }

        self.frames_written
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("video_path", &self.video_path)
            .field("snapshot_path", &self.snapshot_path)
            .field("has_writer", &self.writer.is_some())
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

/// Turns per-frame motion verdicts into recording sessions.
///
/// Owns the open video writer. Every cycle with motion refreshes the hold
/// clock; a session ends on the first cycle where the time since the last
/// motion strictly exceeds the hold time.
pub struct RecordingController {
    settings: RecordingSettings,
    sink_factory: Box<dyn VideoSinkFactory>,
    notifier: Notifier,
    session: Option<RecordingSession>,
    last_motion_time: Option<Instant>,
    sessions_started: u64,
}

impl RecordingController {
    pub fn new(
        settings: RecordingSettings,
        sink_factory: Box<dyn VideoSinkFactory>,
        notifier: Notifier,
    ) -> Self {
        info!(
            "Recording controller ready: hold {:?}, videos in {}, photos in {}",
            settings.hold,
            settings.videos_dir.display(),
            settings.photos_dir.display()
        );

        Self {
            settings,
            sink_factory,
            notifier,
            session: None,
            last_motion_time: None,
            sessions_started: 0,
        }
    }

    pub fn state(&self) -> RecordingState {
        if self.session.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn last_motion_time(&self) -> Option<Instant> {
        self.last_motion_time
    }

    pub fn current_session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    /// Advance the state machine by one cycle, then append `frame` to the
    /// open session if one remains
    pub fn update(&mut self, motion: bool, frame: &Frame, now: Instant) -> Transition {
        let mut transition = Transition::None;

        if motion {
            if self.session.is_none() {
                transition = self.start_session(frame);
            }
            self.last_motion_time = Some(now);
        }

        let hold_expired = self.session.is_some()
            && self
                .last_motion_time
                .is_some_and(|last| now.saturating_duration_since(last) > self.settings.hold);
        if hold_expired {
            transition = self.stop_session(true);
        }

        if let Some(session) = self.session.as_mut() {
            session.append(frame);
        }

        transition
    }

    /// Close any open session without notifying. Safe to call repeatedly.
    pub fn finish(&mut self) {
        if self.session.is_some() {
            info!("Closing active recording session on shutdown");
            self.stop_session(false);
        }
    }

    fn start_session(&mut self, frame: &Frame) -> Transition {
        let stamp = file_stamp(frame.timestamp, self.settings.timezone);
        let video_path = self.settings.videos_dir.join(format!("motion_{}.mp4", stamp));

        let writer = match self.open_writer(&video_path) {
            Ok(writer) => Some(writer),
            Err(e) => {
                error!("Recording without video file: {}", e);
                None
            }
        };

        let id = Uuid::new_v4();
        info!("Motion started; session {} -> {}", id, video_path.display());

        let snapshot_path = save_snapshot(&self.settings.photos_dir, frame, &stamp);

        self.notifier.notify_text(self.settings.messages.started.as_str());
        match &snapshot_path {
            Some(path) => self
                .notifier
                .notify_photo(path.clone(), self.settings.messages.photo_caption.as_str()),
            None => debug!("No snapshot for session {}; skipping photo notification", id),
        }

        self.session = Some(RecordingSession {
            id,
            started_at: frame.timestamp,
            video_path: video_path.clone(),
            snapshot_path: snapshot_path.clone(),
            writer,
            frames_written: 0,
            write_failures: 0,
        });
        self.sessions_started += 1;

        Transition::Started {
            video_path,
            snapshot_path,
        }
    }

    fn open_writer(&self, video_path: &Path) -> crate::error::Result<Box<dyn VideoSink>> {
        std::fs::create_dir_all(&self.settings.videos_dir)?;
        self.sink_factory
            .open(video_path, self.settings.resolution, self.settings.fps)
    }

    fn stop_session(&mut self, notify: bool) -> Transition {
        let Some(session) = self.session.take() else {
            return Transition::None;
        };

        let id = session.id;
        let video_path = session.video_path.clone();
        let frames_written = session.close();

        info!(
            "Recording stopped; session {} wrote {} frames to {}",
            id,
            frames_written,
            video_path.display()
        );

        if notify {
            self.notifier.notify_text(self.settings.messages.ended.as_str());
        }

        Transition::Stopped {
            video_path,
            frames_written,
        }
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.finish();
    }
}
