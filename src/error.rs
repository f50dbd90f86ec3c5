use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("capture error on {interface}: {source}")]
    Capture {
        interface: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of the external route-mutation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("failed to launch {}: {source}", .script.display())]
    Launch {
        script: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("route script exited with status {status:?}: {}", .stderr.trim())]
    Failed { status: Option<i32>, stderr: String },
}
