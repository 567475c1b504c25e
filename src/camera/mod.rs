mod builder;
#[cfg(all(target_os = "linux", feature = "camera"))]
mod interface;
mod source;
mod synthetic;

pub use builder::{open_frame_source, FrameSourceBuilder};
#[cfg(all(target_os = "linux", feature = "camera"))]
pub use interface::GstFrameSource;
pub use source::FrameSource;
pub use synthetic::SyntheticSource;
