//! RCON integration: the client contract, the retry-backoff calculator,
//! and the connection monitor.

mod backoff;
mod client;
mod monitor;

pub use backoff::{BackoffConfig, RetryBackoff, ServerFailureState, ServerHealth};
pub use client::{RconPlayer, RconService, RconStatus};
pub use monitor::{MonitorConfig, RconMonitor};
