//! Configuration types

use crate::dataplane::{DEFAULT_DEDUP_WINDOW, DEFAULT_SOLICIT_INTERVAL};
use crate::telemetry::LogConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Listener configuration (config.toml). Every table is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub solicitation: SolicitationConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to capture on
    pub interface: String,
    /// Per-source duplicate window in milliseconds
    pub dedup_window_ms: u64,
    /// Log non-ULA prefixes at info instead of debug
    pub log_ignored: bool,
    /// Put the interface in promiscuous mode while capturing
    pub promiscuous: bool,
}

impl ListenerConfig {
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            dedup_window_ms: DEFAULT_DEDUP_WINDOW.as_millis() as u64,
            log_ignored: false,
            promiscuous: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolicitationConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl SolicitationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SolicitationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_SOLICIT_INTERVAL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Executable run once per new or re-homed binding
    pub script: PathBuf,
    /// Forget a binding whose application failed so it is retried
    pub retry_failed: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("bin/configure-ipv6-route.sh"),
            retry_failed: false,
        }
    }
}
