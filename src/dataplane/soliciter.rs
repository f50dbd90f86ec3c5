//! Periodic Router Solicitation
//!
//! Routers answer a solicitation with an RA, so sending one every few
//! seconds shortens the time until prefixes are seen. The task shares
//! nothing with the route pipeline besides the cancellation token.

use crate::capture::Capture;
use crate::protocol::icmpv6::RouterSolicitation;
use crate::protocol::ipv6::ALL_ROUTERS;
use crate::protocol::{MacAddr, icmpv6_frame};
use crate::telemetry::ListenerStats;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default interval between solicitations
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// ND messages must leave with the maximum hop limit
const ND_HOP_LIMIT: u8 = 255;

/// Build a complete Router Solicitation frame for ff02::2.
///
/// With a link-local source the frame carries a Source Link-Layer Address
/// option. Without one it is sent from `::` and the option is left out.
pub fn build_solicitation(mac: Option<MacAddr>, link_local: Option<Ipv6Addr>) -> Vec<u8> {
    let (src_addr, slla) = match link_local {
        Some(addr) => (addr, mac),
        None => (Ipv6Addr::UNSPECIFIED, None),
    };

    icmpv6_frame(
        mac.unwrap_or(MacAddr::ZERO),
        MacAddr::ipv6_multicast(&ALL_ROUTERS),
        src_addr,
        ALL_ROUTERS,
        ND_HOP_LIMIT,
        RouterSolicitation::new(slla).to_bytes(),
    )
}

/// Sends a prebuilt solicitation on a fixed interval until cancelled
pub struct Soliciter<S> {
    socket: S,
    interface: String,
    frame: Vec<u8>,
    interval: Duration,
    stats: Arc<ListenerStats>,
}

impl<S: Capture> Soliciter<S> {
    pub fn new(
        socket: S,
        interface: impl Into<String>,
        frame: Vec<u8>,
        interval: Duration,
        stats: Arc<ListenerStats>,
    ) -> Self {
        Self {
            socket,
            interface: interface.into(),
            frame,
            interval,
            stats,
        }
    }

    /// Send immediately, then once per interval. Send failures are logged
    /// and the loop carries on.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interface = %self.interface,
            interval_secs = self.interval.as_secs(),
            "router solicitation started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.socket.send(&self.frame).await {
                Ok(_) => {
                    self.stats.solicitations_sent.inc();
                    debug!(interface = %self.interface, "sent router solicitation");
                }
                Err(e) => {
                    self.stats.solicitation_errors.inc();
                    warn!(interface = %self.interface, error = %e, "failed to send router solicitation");
                }
            }
        }

        debug!(interface = %self.interface, "router solicitation stopped");
    }
}
