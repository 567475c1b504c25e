use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use std::time::SystemTime;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Resolve the configured timezone, falling back to UTC on parse errors.
/// `None` means local time.
pub fn resolve_timezone(tz_name: Option<&str>) -> Option<Tz> {
    let tz_name = tz_name?;
    match tz_name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            tracing::warn!(
                "Invalid timestamp timezone '{}', falling back to UTC",
                tz_name
            );
            Some(chrono_tz::UTC)
        }
    }
}

/// `YYYYMMDD_HHMMSS` stamp used in snapshot and video file names
pub fn file_stamp(timestamp: SystemTime, timezone: Option<Tz>) -> String {
    let utc = DateTime::<Utc>::from(timestamp);
    match timezone {
        Some(tz) => utc.with_timezone(&tz).format(STAMP_FORMAT).to_string(),
        None => utc.with_timezone(&Local).format(STAMP_FORMAT).to_string(),
    }
}
