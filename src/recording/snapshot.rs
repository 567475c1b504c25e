use crate::error::{RecordingError, Result};
use crate::frame::{Frame, SNAPSHOT_JPEG_QUALITY};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Write `snap_<stamp>.jpg` into `dir`. Failures are logged and yield `None`.
pub fn save_snapshot(dir: &Path, frame: &Frame, stamp: &str) -> Option<PathBuf> {
    match write_snapshot(dir, frame, stamp) {
        Ok(path) => {
            info!("Saved snapshot {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Snapshot not saved: {}", e);
            None
        }
    }
}

fn write_snapshot(dir: &Path, frame: &Frame, stamp: &str) -> Result<PathBuf> {
    let path = dir.join(format!("snap_{}.jpg", stamp));
    let snapshot_error = |details: String| RecordingError::Snapshot {
        path: path.display().to_string(),
        details,
    };

    std::fs::create_dir_all(dir).map_err(|e| snapshot_error(e.to_string()))?;
    let jpeg = frame.encode_jpeg(SNAPSHOT_JPEG_QUALITY)?;
    std::fs::write(&path, jpeg).map_err(|e| snapshot_error(e.to_string()))?;

    Ok(path)
}
