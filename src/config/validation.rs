//! Configuration validation

use super::Config;
use crate::telemetry::{LOG_FORMATS, LOG_LEVELS};

const MAX_SENSIBLE_DEDUP_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_listener(config, &mut result);
    validate_solicitation(config, &mut result);
    validate_routes(config, &mut result);
    validate_logging(config, &mut result);

    result
}

fn validate_listener(config: &Config, result: &mut ValidationResult) {
    let listener = &config.listener;

    if listener.interface.trim().is_empty() {
        result.error("listener.interface: must not be empty");
    }

    if listener.dedup_window_ms == 0 {
        result.error("listener.dedup_window_ms: must be greater than zero");
    } else if listener.dedup_window_ms > MAX_SENSIBLE_DEDUP_MS {
        result.warn(format!(
            "listener.dedup_window_ms: {} ms will hide most router retransmissions",
            listener.dedup_window_ms
        ));
    }
}

fn validate_solicitation(config: &Config, result: &mut ValidationResult) {
    let solicitation = &config.solicitation;

    if solicitation.enabled && solicitation.interval_secs == 0 {
        result.error("solicitation.interval_secs: must be greater than zero when enabled");
    }
}

fn validate_routes(config: &Config, result: &mut ValidationResult) {
    let script = &config.routes.script;

    if script.as_os_str().is_empty() {
        result.error("routes.script: must not be empty");
    } else if !script.exists() {
        result.warn(format!(
            "routes.script: '{}' does not exist",
            script.display()
        ));
    }
}

fn validate_logging(config: &Config, result: &mut ValidationResult) {
    let logging = &config.logging;

    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        result.error(format!(
            "logging.level: unknown level '{}' (expected one of {})",
            logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        result.error(format!(
            "logging.format: unknown format '{}' (expected one of {})",
            logging.format,
            LOG_FORMATS.join(", ")
        ));
    }
}
