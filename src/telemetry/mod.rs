//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Counters for the listener pipeline

mod logging;
mod metrics;

pub use logging::{LOG_FORMATS, LOG_LEVELS, LogConfig, init_logging};
pub use metrics::{Counter, ListenerStats};
