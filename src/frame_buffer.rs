use crate::frame::Frame;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Latest-frame cell shared between the capture worker and viewers.
///
/// One writer publishes, any number of readers take snapshots. A published
/// frame is swapped in whole under the lock, so readers never see a partial
/// frame. Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    latest: RwLock<Option<Frame>>,
    published: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held frame
    pub fn publish(&self, frame: Frame) {
        *self.inner.latest.write() = Some(frame);
        self.inner.published.fetch_add(1, Ordering::Relaxed);
    }

    /// The most recently published frame, if any
    pub fn snapshot(&self) -> Option<Frame> {
        self.inner.latest.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.latest.read().is_none()
    }

    /// Number of frames published since creation
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::time::SystemTime;

    fn solid(id: u64, level: u8) -> Frame {
        Frame::new(
            id,
            SystemTime::now(),
            RgbImage::from_pixel(64, 48, Rgb([level, level, level])),
        )
    }

    #[test]
    fn test_empty_until_published() {
        let buffer = FrameBuffer::new();
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_none());

        buffer.publish(solid(1, 10));
        assert_eq!(buffer.snapshot().unwrap().id, 1);
        assert_eq!(buffer.published_count(), 1);
    }

    #[test]
    fn test_publish_replaces_previous_frame() {
        let buffer = FrameBuffer::new();
        buffer.publish(solid(1, 10));
        buffer.publish(solid(2, 20));

        let latest = buffer.snapshot().unwrap();
        assert_eq!(latest.id, 2);
        assert_eq!(latest.image().get_pixel(0, 0)[0], 20);
    }

    #[test]
    fn test_snapshot_outlives_replacement() {
        let buffer = FrameBuffer::new();
        buffer.publish(solid(1, 10));
        let held = buffer.snapshot().unwrap();

        buffer.publish(solid(2, 20));
        assert_eq!(held.id, 1);
        assert_eq!(held.image().get_pixel(5, 5)[0], 10);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_frames() {
        let buffer = FrameBuffer::new();
        let writer_buffer = buffer.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..500u64 {
                writer_buffer.publish(solid(i, (i % 256) as u8));
            }
        });

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader_buffer = buffer.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(frame) = reader_buffer.snapshot() {
                            let level = (frame.id % 256) as u8;
                            assert!(frame.image().pixels().all(|p| p[0] == level));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(buffer.snapshot().unwrap().id, 499);
        assert_eq!(buffer.published_count(), 500);
    }
}
