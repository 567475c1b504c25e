mod handle;
mod pipeline;
mod state;

pub use handle::{spawn_capture, CaptureHandle};
pub use pipeline::{CaptureLoop, CaptureStats, CycleOutcome};
pub use state::{CaptureControl, CaptureState};
