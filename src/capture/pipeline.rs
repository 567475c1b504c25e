use super::state::CaptureControl;
use crate::analyzer::{BackgroundModel, MotionClassifier};
use crate::camera::FrameSource;
use crate::frame_buffer::FrameBuffer;
use crate::recording::{RecordingController, Transition};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Back-off between reads while the camera is failing
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Running counters for the capture worker
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureStats {
    pub cycles: u64,
    pub skipped_reads: u64,
    pub motion_cycles: u64,
    pub sessions_started: u64,
    pub recording: bool,
}

/// Result of a single capture cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The frame read failed; nothing else happened
    Skipped,
    Processed { motion: bool, transition: Transition },
}

/// Read → detect → record → publish, once per camera frame
pub struct CaptureLoop {
    source: Box<dyn FrameSource>,
    model: BackgroundModel,
    classifier: MotionClassifier,
    controller: RecordingController,
    buffer: FrameBuffer,
    state: CaptureControl,
    stats: Arc<Mutex<CaptureStats>>,
    frame_interval: Duration,
    consecutive_failures: u64,
}

impl CaptureLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        model: BackgroundModel,
        classifier: MotionClassifier,
        controller: RecordingController,
        buffer: FrameBuffer,
        state: CaptureControl,
    ) -> Self {
        Self {
            source,
            model,
            classifier,
            controller,
            buffer,
            state,
            stats: Arc::new(Mutex::new(CaptureStats::default())),
            frame_interval: Duration::ZERO,
            consecutive_failures: 0,
        }
    }

    /// Pace `run` to at most `fps` cycles per second. Without this the loop
    /// runs as fast as the source delivers frames.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / fps as f64)
        };
        self
    }

    pub fn control(&self) -> &CaptureControl {
        &self.state
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn controller(&self) -> &RecordingController {
        &self.controller
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.source.resolution()
    }

    pub(crate) fn shared_stats(&self) -> Arc<Mutex<CaptureStats>> {
        Arc::clone(&self.stats)
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats.lock().clone()
    }

    /// Run one cycle with `now` as the motion clock
    pub fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        let frame = match self.source.read() {
            Ok(frame) => frame,
            Err(e) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures == 1 || self.consecutive_failures % 50 == 0 {
                    warn!(
                        "Frame read failed ({} in a row): {}",
                        self.consecutive_failures, e
                    );
                }
                self.stats.lock().skipped_reads += 1;
                return CycleOutcome::Skipped;
            }
        };

        if self.consecutive_failures > 0 {
            info!(
                "Camera recovered after {} failed reads",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
        }

        let mask = self.model.apply(&frame);
        let verdict = self.classifier.classify(&mask);
        let annotated = frame.annotated(&verdict.regions);

        if verdict.motion_detected {
            trace!(
                "Frame {}: motion in {} regions ({} px)",
                frame.id,
                verdict.regions.len(),
                verdict.total_area()
            );
        }

        let transition = self
            .controller
            .update(verdict.motion_detected, &annotated, now);
        self.buffer.publish(annotated);

        {
            let mut stats = self.stats.lock();
            stats.cycles += 1;
            if verdict.motion_detected {
                stats.motion_cycles += 1;
            }
            stats.sessions_started = self.controller.sessions_started();
            stats.recording = self.controller.is_recording();
        }

        CycleOutcome::Processed {
            motion: verdict.motion_detected,
            transition,
        }
    }

    /// Cycle until a stop is requested, then release the writer and camera
    pub fn run(mut self) -> CaptureStats {
        info!(
            "Capture loop started ({}x{})",
            self.source.resolution().0,
            self.source.resolution().1
        );

        while !self.state.is_stop_requested() {
            let cycle_start = Instant::now();

            if let CycleOutcome::Skipped = self.run_cycle(cycle_start) {
                std::thread::sleep(READ_RETRY_DELAY);
                continue;
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }

        self.shutdown()
    }

    fn shutdown(mut self) -> CaptureStats {
        debug!("Capture loop releasing resources");
        self.controller.finish();
        self.source.close();

        let stats = {
            let mut stats = self.stats.lock();
            stats.recording = false;
            stats.clone()
        };
        self.state.mark_stopped();

        info!(
            "Capture loop stopped after {} cycles ({} skipped reads, {} sessions)",
            stats.cycles, stats.skipped_reads, stats.sessions_started
        );
        stats
    }
}
