//! Sources of raw Puma statistics.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               PumaPlugin                 │
//! └────────────────────┬─────────────────────┘
//!                      │
//!               ┌──────▼──────┐
//!               │ StatsSource │ (trait)
//!               └──────┬──────┘
//!          ┌───────────┴───────────┐
//!   ┌──────▼──────┐         ┌──────▼──────┐
//!   │ControlClient│         │ MockSource  │
//!   │ tcp / unix  │         │ (Testing)   │
//!   └─────────────┘         └─────────────┘
//! ```

mod control;
pub mod mock;

pub use control::ControlClient;
pub use mock::MockSource;

use crate::metrics::{AllocatorStats, RuntimeStats};

/// Error type for a single stats request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Could not reach the control server or read its response.
    Connection(String),
    /// Control server answered with a non-success status.
    Status(u16),
    /// Response body was not the expected JSON.
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Connection(msg) => write!(f, "control server connection failed: {}", msg),
            FetchError::Status(code) => write!(f, "control server returned status {}", code),
            FetchError::Decode(msg) => {
                write!(f, "failed to decode control server response: {}", msg)
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetches raw statistics from a Puma control server.
///
/// Each call performs one request; nothing is cached or retried.
pub trait StatsSource: Send + Sync {
    /// Fetches `/stats`.
    fn fetch_runtime_stats(&self) -> Result<RuntimeStats, FetchError>;

    /// Fetches `/gc-stats`.
    fn fetch_allocator_stats(&self) -> Result<AllocatorStats, FetchError>;
}
