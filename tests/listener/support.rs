//! Frame builders and a recording route mutator

use ra_listener::ApplyError;
use ra_listener::dataplane::{
    ApplyOutput, Binding, ListenerSettings, RaListener, RouteMutator,
};
use ra_listener::protocol::icmpv6::{
    PrefixInformation, RouteInformation, RoutePreference, RouterAdvertisementBuilder,
};
use ra_listener::protocol::ipv6::ALL_NODES;
use ra_listener::protocol::{MacAddr, icmpv6_frame};
use ra_listener::telemetry::ListenerStats;
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};

pub const INTERFACE: &str = "wpan0";

/// Records every binding it is asked to apply
#[derive(Clone, Default)]
pub struct RecordingMutator {
    pub applied: Arc<Mutex<Vec<Binding>>>,
}

impl RecordingMutator {
    pub fn calls(&self) -> Vec<Binding> {
        self.applied.lock().unwrap().clone()
    }
}

impl RouteMutator for RecordingMutator {
    async fn apply(&mut self, binding: &Binding) -> Result<ApplyOutput, ApplyError> {
        self.applied.lock().unwrap().push(binding.clone());
        Ok(ApplyOutput {
            stdout: format!("applied {}", binding),
        })
    }
}

pub fn listener() -> (RaListener<RecordingMutator>, RecordingMutator) {
    let mutator = RecordingMutator::default();
    let listener = RaListener::new(
        ListenerSettings::new(INTERFACE),
        mutator.clone(),
        Arc::new(ListenerStats::new()),
    );
    (listener, mutator)
}

pub fn addr(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

pub fn pio(prefix: &str, len: u8) -> PrefixInformation {
    PrefixInformation::new(addr(prefix), len, true, true, 2_592_000, 604_800)
}

pub fn rio(prefix: &str, len: u8) -> RouteInformation {
    RouteInformation::new(addr(prefix), len, RoutePreference::Medium, 1800)
}

/// Wrap an RA built by `builder` in IPv6 and Ethernet headers from `source`
pub fn ra_frame(source: &str, builder: RouterAdvertisementBuilder) -> Vec<u8> {
    icmpv6_frame(
        MacAddr([0x02, 0x00, 0x5e, 0x00, 0x53, 0x01]),
        MacAddr::ipv6_multicast(&ALL_NODES),
        addr(source),
        ALL_NODES,
        255,
        builder.to_bytes(),
    )
}

/// RA from `source` carrying one Prefix Information option per prefix
pub fn prefix_ra(source: &str, prefixes: &[(&str, u8)]) -> Vec<u8> {
    let builder = prefixes
        .iter()
        .fold(RouterAdvertisementBuilder::new(64, 1800), |b, (p, len)| {
            b.prefix(&pio(p, *len))
        });
    ra_frame(source, builder)
}

pub fn binding(prefix: &str, len: u8, router: &str) -> Binding {
    Binding::new(addr(prefix), len, addr(router), INTERFACE)
}
