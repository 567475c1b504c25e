use crate::error::{CameraError, Result};
use crate::frame::Frame;
use image::RgbImage;

/// A camera that yields frames already scaled to the configured resolution.
///
/// A source is owned by exactly one capture worker. `read` may block briefly
/// on the device and may fail transiently; callers retry on the next cycle.
pub trait FrameSource: Send {
    /// Read the next frame
    fn read(&mut self) -> Result<Frame>;

    /// Release the device. Safe to call more than once.
    fn close(&mut self);

    /// Resolution of delivered frames (width, height)
    fn resolution(&self) -> (u32, u32);

    fn is_open(&self) -> bool;
}

impl FrameSource for Box<dyn FrameSource> {
    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Copy packed RGB rows out of a buffer whose rows are `stride` bytes apart
#[cfg_attr(not(all(target_os = "linux", feature = "camera")), allow(dead_code))]
pub(crate) fn pack_rgb_rows(data: &[u8], width: u32, height: u32, stride: usize) -> Result<RgbImage> {
    let row_bytes = width as usize * 3;
    let short_buffer = || CameraError::ReadFailed {
        details: format!(
            "Short buffer: {} bytes for {}x{} (stride {})",
            data.len(),
            width,
            height,
            stride
        ),
    };

    if width == 0 || height == 0 {
        return Err(CameraError::ReadFailed {
            details: format!("Empty frame geometry {}x{}", width, height),
        }
        .into());
    }

    let last_row_start = stride
        .checked_mul(height as usize - 1)
        .ok_or_else(short_buffer)?;
    if stride < row_bytes || data.len() < last_row_start + row_bytes {
        return Err(short_buffer().into());
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }

    RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        CameraError::ReadFailed {
            details: "Failed to build RGB image from buffer".to_string(),
        }
        .into()
    })
}
