//! Packet capture backends
//!
//! Provides the raw-frame source the listener reads Router Advertisements from
//! and the transmit path the solicitation task writes to.

mod af_packet;
pub mod filter;
pub mod interface;

pub use af_packet::AfPacketSocket;
pub use filter::{CAPTURE_FILTER, router_advertisement_filter};

use crate::Result;
use std::future::Future;

/// Information about a received packet
#[derive(Debug, Clone)]
pub struct RxInfo {
    /// Number of bytes received
    pub len: usize,
}

/// Packet capture backend trait
pub trait Capture: Send {
    /// Receive a packet into the provided buffer
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<RxInfo>> + Send;

    /// Send a packet
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize>> + Send;
}
