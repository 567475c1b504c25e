use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lifecycle of the capture worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Running,
    Stopping,
    Stopped,
}

impl CaptureState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CaptureState::Running,
            1 => CaptureState::Stopping,
            _ => CaptureState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CaptureState::Running => 0,
            CaptureState::Stopping => 1,
            CaptureState::Stopped => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Running => "running",
            CaptureState::Stopping => "stopping",
            CaptureState::Stopped => "stopped",
        }
    }
}

/// Shared stop flag observed by the capture loop at the top of every cycle
#[derive(Debug, Clone)]
pub struct CaptureControl {
    token: CancellationToken,
    state: Arc<AtomicU8>,
}

impl CaptureControl {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            state: Arc::new(AtomicU8::new(CaptureState::Running.as_u8())),
        }
    }

    pub fn state(&self) -> CaptureState {
        CaptureState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == CaptureState::Running
    }

    /// Request a stop. Idempotent; never blocks.
    pub fn stop(&self) {
        let requested = self
            .state
            .compare_exchange(
                CaptureState::Running.as_u8(),
                CaptureState::Stopping.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if requested {
            info!("Capture stop requested");
        }
        self.token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn mark_stopped(&self) {
        self.token.cancel();
        self.state
            .store(CaptureState::Stopped.as_u8(), Ordering::Release);
    }
}

impl Default for CaptureControl {
    fn default() -> Self {
        Self::new()
    }
}
