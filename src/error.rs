use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomecamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl HomecamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Camera device failures
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera device {index} unavailable: {details}")]
    DeviceUnavailable { index: u32, details: String },

    #[error("Frame read failed: {details}")]
    ReadFailed { details: String },

    #[error("Camera configuration failed: {details}")]
    Configuration { details: String },
}

/// Video writer and snapshot failures
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Failed to open video writer for {path}: {details}")]
    WriterOpen { path: String, details: String },

    #[error("Failed to write video frame: {details}")]
    WriteFailed { details: String },

    #[error("Failed to finalize video {path}: {details}")]
    Finalize { path: String, details: String },

    #[error("Failed to write snapshot {path}: {details}")]
    Snapshot { path: String, details: String },

    #[error("Image encoding failed: {details}")]
    Encoding { details: String },
}

/// HTTP streaming failures
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream server failed: {details}")]
    StartupFailed { details: String },
}

pub type Result<T> = std::result::Result<T, HomecamError>;
