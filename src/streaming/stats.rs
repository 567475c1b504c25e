use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Viewer counters shared by every stream connection
#[derive(Debug, Default)]
pub struct StreamStats {
    active_connections: AtomicU64,
    total_connections: AtomicU64,
    frames_streamed: AtomicU64,
    bytes_streamed: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStatsSnapshot {
    pub active_connections: u64,
    pub total_connections: u64,
    pub frames_streamed: u64,
    pub bytes_streamed: u64,
}

impl StreamStats {
    /// Register a viewer; the returned guard unregisters it when dropped
    pub fn connect(self: &Arc<Self>) -> ViewerGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        ViewerGuard {
            stats: Arc::clone(self),
        }
    }

    pub fn record_frame(&self, frame_size: usize) {
        self.frames_streamed.fetch_add(1, Ordering::Relaxed);
        self.bytes_streamed
            .fetch_add(frame_size as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            frames_streamed: self.frames_streamed.load(Ordering::Relaxed),
            bytes_streamed: self.bytes_streamed.load(Ordering::Relaxed),
        }
    }
}

pub struct ViewerGuard {
    stats: Arc<StreamStats>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.stats
            .active_connections
            .fetch_sub(1, Ordering::Relaxed);
    }
}
