mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::HomecamOrchestrator;
pub use types::{ComponentState, ShutdownReason};
