use super::source::FrameSource;
use crate::error::{CameraError, Result};
use crate::frame::Frame;
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

const BACKGROUND_LEVEL: u8 = 100;
const OBJECT_LEVEL: u8 = 250;

#[derive(Debug, Clone, Copy)]
enum Step {
    Static,
    Square { x: u32, y: u32, size: u32 },
    Failure,
}

/// Scripted camera: a flat gray scene with an optional bright moving square
/// and injected read failures. Once the script runs out it keeps producing
/// static frames.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    script: VecDeque<Step>,
    frame_counter: u64,
    reads: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            script: VecDeque::new(),
            frame_counter: 0,
            reads: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append `count` frames of the empty scene
    pub fn static_frames(mut self, count: usize) -> Self {
        self.script.extend(std::iter::repeat(Step::Static).take(count));
        self
    }

    /// Append `count` frames with a `size`x`size` square moving `step`
    /// pixels to the right each frame, vertically centered
    pub fn moving_square(mut self, count: usize, size: u32, step: u32) -> Self {
        let size = size.min(self.width).min(self.height);
        let travel = (self.width - size).max(1);
        let y = (self.height - size) / 2;
        for i in 0..count as u32 {
            let x = (i * step) % travel;
            self.script.push_back(Step::Square { x, y, size });
        }
        self
    }

    /// Append `count` failing reads
    pub fn read_failures(mut self, count: usize) -> Self {
        self.script.extend(std::iter::repeat(Step::Failure).take(count));
        self
    }

    /// Shared flag set once the source is closed
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Shared counter of read attempts
    pub fn read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reads)
    }

    fn render(&self, step: Step) -> RgbImage {
        let mut image = RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([BACKGROUND_LEVEL, BACKGROUND_LEVEL, BACKGROUND_LEVEL]),
        );

        if let Step::Square { x, y, size } = step {
            for py in y..(y + size).min(self.height) {
                for px in x..(x + size).min(self.width) {
                    image.put_pixel(px, py, Rgb([OBJECT_LEVEL, OBJECT_LEVEL, OBJECT_LEVEL]));
                }
            }
        }

        image
    }
}

impl FrameSource for SyntheticSource {
    fn read(&mut self) -> Result<Frame> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        if self.closed.load(Ordering::Relaxed) {
            return Err(CameraError::ReadFailed {
                details: "Synthetic source is closed".to_string(),
            }
            .into());
        }

        let step = self.script.pop_front().unwrap_or(Step::Static);
        if let Step::Failure = step {
            debug!("Synthetic source injecting read failure");
            return Err(CameraError::ReadFailed {
                details: "Injected read failure".to_string(),
            }
            .into());
        }

        let frame_id = self.frame_counter;
        self.frame_counter += 1;
        trace!("Generated synthetic frame {} ({:?})", frame_id, step);

        Ok(Frame::new(frame_id, SystemTime::now(), self.render(step)))
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Synthetic source closed");
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }
}
