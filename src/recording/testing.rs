//! In-memory video sinks for tests

use super::writer::{VideoSink, VideoSinkFactory};
use crate::error::{RecordingError, Result};
use crate::frame::Frame;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct SinkLog {
    pub opened: Vec<PathBuf>,
    pub writes: u64,
    pub closes: u64,
}

#[derive(Clone, Default)]
pub(crate) struct FakeSinkFactory {
    pub log: Arc<Mutex<SinkLog>>,
    pub fail_open: bool,
    pub fail_writes: bool,
}

struct FakeSink {
    log: Arc<Mutex<SinkLog>>,
    fail_writes: bool,
}

impl VideoSink for FakeSink {
    fn write(&mut self, _frame: &Frame) -> Result<()> {
        if self.fail_writes {
            return Err(RecordingError::WriteFailed {
                details: "disk full".to_string(),
            }
            .into());
        }
        self.log.lock().writes += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.log.lock().closes += 1;
        Ok(())
    }
}

impl VideoSinkFactory for FakeSinkFactory {
    fn open(&self, path: &Path, _resolution: (u32, u32), _fps: u32) -> Result<Box<dyn VideoSink>> {
        if self.fail_open {
            return Err(RecordingError::WriterOpen {
                path: path.display().to_string(),
                details: "encoder missing".to_string(),
            }
            .into());
        }
        self.log.lock().opened.push(path.to_path_buf());
        Ok(Box::new(FakeSink {
            log: Arc::clone(&self.log),
            fail_writes: self.fail_writes,
        }))
    }
}
