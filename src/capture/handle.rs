use super::pipeline::{CaptureLoop, CaptureStats};
use super::state::{CaptureControl, CaptureState};
use crate::frame::{encode_placeholder, STREAM_JPEG_QUALITY};
use crate::frame_buffer::FrameBuffer;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug)]
struct EncodedFrame {
    id: u64,
    timestamp: SystemTime,
    jpeg: Vec<u8>,
}

/// Cloneable view of a running capture loop for viewer handlers
#[derive(Clone)]
pub struct CaptureHandle {
    buffer: FrameBuffer,
    control: CaptureControl,
    stats: Arc<Mutex<CaptureStats>>,
    placeholder: Arc<Vec<u8>>,
    last_encoded: Arc<Mutex<Option<EncodedFrame>>>,
}

impl CaptureHandle {
    pub(crate) fn new(
        buffer: FrameBuffer,
        control: CaptureControl,
        stats: Arc<Mutex<CaptureStats>>,
        resolution: (u32, u32),
    ) -> Self {
        Self {
            buffer,
            control,
            stats,
            placeholder: Arc::new(encode_placeholder(resolution.0, resolution.1)),
            last_encoded: Arc::new(Mutex::new(None)),
        }
    }

    /// JPEG of the latest frame, or a blank frame before the first capture.
    /// Concurrent viewers share one encoding per frame.
    pub fn get_jpeg(&self) -> Vec<u8> {
        let Some(frame) = self.buffer.snapshot() else {
            return self.placeholder.as_ref().clone();
        };

        let mut cache = self.last_encoded.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.id == frame.id && cached.timestamp == frame.timestamp {
                return cached.jpeg.clone();
            }
        }

        match frame.encode_jpeg(STREAM_JPEG_QUALITY) {
            Ok(jpeg) if !jpeg.is_empty() => {
                *cache = Some(EncodedFrame {
                    id: frame.id,
                    timestamp: frame.timestamp,
                    jpeg: jpeg.clone(),
                });
                jpeg
            }
            Ok(_) => self.placeholder.as_ref().clone(),
            Err(e) => {
                warn!("Failed to encode frame {} for viewers: {}", frame.id, e);
                self.placeholder.as_ref().clone()
            }
        }
    }

    /// Ask the capture loop to stop after its current cycle
    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn state(&self) -> CaptureState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn is_recording(&self) -> bool {
        self.stats.lock().recording
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats.lock().clone()
    }

    pub fn control(&self) -> &CaptureControl {
        &self.control
    }
}

/// Run the capture loop on a dedicated blocking worker
pub fn spawn_capture(capture: CaptureLoop) -> (CaptureHandle, JoinHandle<CaptureStats>) {
    let handle = CaptureHandle::new(
        capture.buffer().clone(),
        capture.control().clone(),
        capture.shared_stats(),
        capture.resolution(),
    );

    info!("Spawning capture worker");
    let join = tokio::task::spawn_blocking(move || capture.run());
    (handle, join)
}
