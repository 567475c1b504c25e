use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HomecamConfig {
    pub camera: CameraConfig,
    pub motion: MotionConfig,
    pub recording: RecordingConfig,
    pub notifier: NotifierConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Frame resolution (width, height) delivered to the capture loop
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Target capture cadence
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// How long a single frame read may block before it counts as failed
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MotionConfig {
    /// Minimum region area in pixels; regions must be strictly larger
    #[serde(default = "default_min_area")]
    pub min_area: u32,

    /// Motion sensitivity in [0, 1]; higher is more sensitive
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// Background model history length in frames
    #[serde(default = "default_history")]
    pub history: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingConfig {
    /// Seconds to keep recording after the last motion
    #[serde(default = "default_hold_seconds")]
    pub hold_seconds: u64,

    /// Directory for snapshot photos
    #[serde(default = "default_photos_dir")]
    pub photos_dir: String,

    /// Directory for motion videos
    #[serde(default = "default_videos_dir")]
    pub videos_dir: String,

    /// Frame rate written into video files
    #[serde(default = "default_video_fps")]
    pub video_fps: u32,

    /// IANA timezone used for file names; local time when unset
    #[serde(default)]
    pub timestamp_timezone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifierConfig {
    /// Telegram bot token; notifications are skipped when empty
    #[serde(default)]
    pub bot_token: String,

    /// Telegram chat id; notifications are skipped when empty
    #[serde(default)]
    pub chat_id: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_message_timeout")]
    pub message_timeout_secs: u64,

    #[serde(default = "default_photo_timeout")]
    pub photo_timeout_secs: u64,

    #[serde(default = "default_started_message")]
    pub started_message: String,

    #[serde(default = "default_ended_message")]
    pub ended_message: String,

    #[serde(default = "default_photo_caption")]
    pub photo_caption: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// IP address to bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_stream_port")]
    pub port: u16,

    /// MJPEG pacing for viewers
    #[serde(default = "default_stream_fps")]
    pub fps: u32,

    /// Number of photos listed on the index page
    #[serde(default = "default_recent_photos")]
    pub recent_photos: usize,

    /// Number of videos listed on the index page
    #[serde(default = "default_recent_videos")]
    pub recent_videos: usize,
}

impl MotionConfig {
    /// Variance threshold for the background model, derived from sensitivity
    pub fn var_threshold(&self) -> f32 {
        (50.0 + (1.0 - self.sensitivity.clamp(0.0, 1.0)) * 100.0).trunc() as f32
    }
}

impl HomecamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("homecam.toml")
    }

    /// Load configuration from a specific file path, with `HOMECAM_` environment
    /// overrides on top
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_environment(path, Self::environment())
    }

    /// Environment source. Sections are split by a double underscore so that
    /// field names keep their own: `HOMECAM_NOTIFIER__BOT_TOKEN` sets
    /// `notifier.bot_token`.
    fn environment() -> Environment {
        Environment::with_prefix("HOMECAM")
            .prefix_separator("_")
            .separator("__")
    }

    fn load_with_environment<P: AsRef<Path>>(
        path: P,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.read_timeout_ms", default_read_timeout_ms())?
            .set_default("motion.min_area", default_min_area())?
            .set_default("motion.sensitivity", default_sensitivity())?
            .set_default("motion.history", default_history())?
            .set_default("recording.hold_seconds", default_hold_seconds())?
            .set_default("recording.photos_dir", default_photos_dir())?
            .set_default("recording.videos_dir", default_videos_dir())?
            .set_default("recording.video_fps", default_video_fps())?
            .set_default("notifier.bot_token", "")?
            .set_default("notifier.chat_id", "")?
            .set_default("notifier.api_base", default_api_base())?
            .set_default("notifier.message_timeout_secs", default_message_timeout())?
            .set_default("notifier.photo_timeout_secs", default_photo_timeout())?
            .set_default("notifier.started_message", default_started_message())?
            .set_default("notifier.ended_message", default_ended_message())?
            .set_default("notifier.photo_caption", default_photo_caption())?
            .set_default("stream.ip", default_stream_ip())?
            .set_default("stream.port", default_stream_port())?
            .set_default("stream.fps", default_stream_fps())?
            .set_default("stream.recent_photos", default_recent_photos() as i64)?
            .set_default("stream.recent_videos", default_recent_videos() as i64)?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(environment)
            .build()?;

        let config: HomecamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        // File names have one-second resolution; a zero hold lets two sessions
        // start within the same second and share a name
        if self.recording.hold_seconds == 0 {
            return Err(ConfigError::Message(
                "Recording hold_seconds must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.motion.sensitivity) {
            return Err(ConfigError::Message(format!(
                "Motion sensitivity must be within [0, 1], got {}",
                self.motion.sensitivity
            )));
        }

        if self.motion.history == 0 {
            return Err(ConfigError::Message(
                "Background history must be greater than 0".to_string(),
            ));
        }

        if self.recording.video_fps == 0 {
            return Err(ConfigError::Message(
                "Video fps must be greater than 0".to_string(),
            ));
        }

        if self.stream.fps == 0 {
            return Err(ConfigError::Message(
                "Stream fps must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for HomecamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                read_timeout_ms: default_read_timeout_ms(),
            },
            motion: MotionConfig {
                min_area: default_min_area(),
                sensitivity: default_sensitivity(),
                history: default_history(),
            },
            recording: RecordingConfig {
                hold_seconds: default_hold_seconds(),
                photos_dir: default_photos_dir(),
                videos_dir: default_videos_dir(),
                video_fps: default_video_fps(),
                timestamp_timezone: None,
            },
            notifier: NotifierConfig {
                bot_token: String::new(),
                chat_id: String::new(),
                api_base: default_api_base(),
                message_timeout_secs: default_message_timeout(),
                photo_timeout_secs: default_photo_timeout(),
                started_message: default_started_message(),
                ended_message: default_ended_message(),
                photo_caption: default_photo_caption(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                port: default_stream_port(),
                fps: default_stream_fps(),
                recent_photos: default_recent_photos(),
                recent_videos: default_recent_videos(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    20
}
fn default_read_timeout_ms() -> u64 {
    500
}

fn default_min_area() -> u32 {
    1200
}
fn default_sensitivity() -> f64 {
    0.45
}
fn default_history() -> u32 {
    400
}

fn default_hold_seconds() -> u64 {
    7
}
fn default_photos_dir() -> String {
    "photos".to_string()
}
fn default_videos_dir() -> String {
    "videos".to_string()
}
fn default_video_fps() -> u32 {
    20
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_message_timeout() -> u64 {
    10
}
fn default_photo_timeout() -> u64 {
    20
}
fn default_started_message() -> String {
    "⚠️ Motion detected! Recording started.".to_string()
}
fn default_ended_message() -> String {
    "✅ Motion ended. Recording stopped.".to_string()
}
fn default_photo_caption() -> String {
    "Snapshot".to_string()
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_stream_port() -> u16 {
    5000
}
fn default_stream_fps() -> u32 {
    20
}
fn default_recent_photos() -> usize {
    50
}
fn default_recent_videos() -> usize {
    30
}
