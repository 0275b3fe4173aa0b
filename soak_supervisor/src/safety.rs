//! Safety module root.
//!
//! Write-once shutdown signaling and the battery telemetry supervisor.

pub mod monitor;
pub mod shutdown;

pub use monitor::SafetySupervisor;
pub use shutdown::{ShutdownReason, ShutdownSignal};
