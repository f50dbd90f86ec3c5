//! Configuration management
//!
//! Handles the optional config.toml; command-line flags are layered on top
//! by the binary.

mod types;
mod validation;

pub use types::*;
pub use validation::{ValidationResult, validate};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}
