use crate::analyzer::MotionRegion;
use crate::error::{RecordingError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::sync::Arc;
use std::time::SystemTime;

/// JPEG quality used for viewer frames
pub const STREAM_JPEG_QUALITY: u8 = 80;
/// JPEG quality used for snapshot photos
pub const SNAPSHOT_JPEG_QUALITY: u8 = 90;

const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// A captured RGB frame. The pixel data is shared and never mutated in place;
/// annotation produces a new frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic frame identifier assigned by the source
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(id: u64, timestamp: SystemTime, image: RgbImage) -> Self {
        Self {
            id,
            timestamp,
            image: Arc::new(image),
        }
    }

    /// All-black frame of the given dimensions
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(0, SystemTime::now(), RgbImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Raw packed RGB bytes
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Luma conversion for the background model
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(self.image.as_ref())
    }

    /// Copy of this frame with a bounding box drawn around each region
    pub fn annotated(&self, regions: &[MotionRegion]) -> Frame {
        if regions.is_empty() {
            return self.clone();
        }

        let mut canvas = self.image.as_ref().clone();
        for region in regions {
            // 2px border: outer rect plus one inset
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height),
                REGION_COLOR,
            );
            if region.width > 2 && region.height > 2 {
                draw_hollow_rect_mut(
                    &mut canvas,
                    Rect::at(region.x as i32 + 1, region.y as i32 + 1)
                        .of_size(region.width - 2, region.height - 2),
                    REGION_COLOR,
                );
            }
        }

        Frame {
            id: self.id,
            timestamp: self.timestamp,
            image: Arc::new(canvas),
        }
    }

    /// Encode the frame as JPEG
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        encode_rgb_jpeg(&self.image, quality)
    }
}

fn encode_rgb_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(image)
        .map_err(|e| RecordingError::Encoding {
            details: e.to_string(),
        })?;
    Ok(buf)
}

/// Encode a blank frame of the given size; used whenever no real frame exists yet
pub fn encode_placeholder(width: u32, height: u32) -> Vec<u8> {
    let blank = RgbImage::new(width.max(1), height.max(1));
    match encode_rgb_jpeg(&blank, STREAM_JPEG_QUALITY) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            tracing::error!("Failed to encode {}x{} placeholder: {}", width, height, e);
            Vec::new()
        }
    }
}
