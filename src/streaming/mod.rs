mod handlers;
mod media;
mod server;
mod stats;

pub use media::list_recent;
pub use server::{StreamServer, StreamServerBuilder};
pub use stats::{StreamStats, StreamStatsSnapshot};
