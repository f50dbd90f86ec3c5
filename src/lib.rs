//! RA Listener
//!
//! Watches IPv6 Router Advertisements on one interface and applies the
//! Unique Local Address routes they carry through an external script.
//! Frames are captured and parsed in userspace; Router Solicitations are
//! sent periodically to prompt routers to advertise.

pub mod capture;
pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{ApplyError, Error, Result};
