//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Counters for table synchronization

mod logging;
mod metrics;

pub(crate) use logging::is_known_level;
pub use logging::{init_logging, LogConfig};
pub use metrics::{Counter, SyncMetrics};
