//! Router Advertisement decoding
//!
//! Turns a captured Ethernet frame into a [`RouterAdvertisementEvent`].
//! Decoding happens in two steps so the duplicate window can be consulted
//! between them: [`classify`] confirms the frame is an RA and exposes its
//! source address, then [`RaFrame::decode`] walks the options area.
//! Neither step touches shared state.

use crate::protocol::ethernet::Frame;
use crate::protocol::icmpv6::{
    self, Icmpv6Type, NdpOptionType, OptionError, PrefixInformation, RouteInformation,
    RoutePreference, RouterAdvertisement,
};
use crate::protocol::ipv6::{Ipv6Header, NextHeader, mask_prefix};
use std::fmt;
use std::net::Ipv6Addr;
use std::time::Instant;

/// Why a frame was not treated as a Router Advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotAnRa {
    /// Frame shorter than an Ethernet header
    Truncated,
    /// EtherType is not IPv6
    NotIpv6 { ethertype: u16 },
    /// IPv6 header or extension chain could not be parsed
    MalformedIpv6(String),
    /// Upper-layer protocol is not ICMPv6
    NotIcmpv6 { next_header: u8 },
    /// ICMPv6 message of another type
    OtherMessage { msg_type: u8 },
    /// RA shorter than its fixed header
    ShortMessage { len: usize },
    /// RA code field must be zero
    BadCode { code: u8 },
    /// ICMPv6 checksum mismatch
    BadChecksum,
}

impl fmt::Display for NotAnRa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotAnRa::Truncated => write!(f, "truncated frame"),
            NotAnRa::NotIpv6 { ethertype } => write!(f, "ethertype {:#06x}", ethertype),
            NotAnRa::MalformedIpv6(reason) => write!(f, "malformed IPv6: {}", reason),
            NotAnRa::NotIcmpv6 { next_header } => write!(f, "next header {}", next_header),
            NotAnRa::OtherMessage { msg_type } => write!(f, "ICMPv6 type {}", msg_type),
            NotAnRa::ShortMessage { len } => write!(f, "RA of {} bytes", len),
            NotAnRa::BadCode { code } => write!(f, "RA with code {}", code),
            NotAnRa::BadChecksum => write!(f, "bad ICMPv6 checksum"),
        }
    }
}

/// Prefix from a Prefix Information option, host bits cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixOption {
    pub prefix: Ipv6Addr,
    pub prefix_length: u8,
}

/// Prefix from a Route Information option, host bits cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOption {
    pub prefix: Ipv6Addr,
    pub prefix_length: u8,
    pub preference: Option<RoutePreference>,
}

/// Which option an advertised prefix came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    PrefixInformation,
    RouteInformation,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::PrefixInformation => write!(f, "prefix-information"),
            OptionKind::RouteInformation => write!(f, "route-information"),
        }
    }
}

/// An option the decoder skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOption {
    /// Option type, if the option header itself was readable
    pub option_type: Option<u8>,
    pub error: OptionError,
}

/// One received Router Advertisement
#[derive(Debug, Clone)]
pub struct RouterAdvertisementEvent {
    pub source: Ipv6Addr,
    pub prefixes: Vec<PrefixOption>,
    pub routes: Vec<RouteOption>,
    pub received_at: Instant,
    /// Malformed options, in the order they were met
    pub skipped: Vec<SkippedOption>,
}

impl RouterAdvertisementEvent {
    /// Every advertised prefix, Prefix Information first, each list in wire order
    pub fn advertised(&self) -> impl Iterator<Item = (OptionKind, Ipv6Addr, u8)> + '_ {
        let prefixes = self
            .prefixes
            .iter()
            .map(|p| (OptionKind::PrefixInformation, p.prefix, p.prefix_length));
        let routes = self
            .routes
            .iter()
            .map(|r| (OptionKind::RouteInformation, r.prefix, r.prefix_length));
        prefixes.chain(routes)
    }
}

/// A frame confirmed to carry a Router Advertisement
#[derive(Debug)]
pub struct RaFrame<'a> {
    source: Ipv6Addr,
    ra: RouterAdvertisement<'a>,
}

impl<'a> RaFrame<'a> {
    pub fn source(&self) -> Ipv6Addr {
        self.source
    }

    /// Walk the options area.
    ///
    /// Malformed options are recorded in `skipped` and the walk continues
    /// with the next option. Option types other than 3 and 24 are ignored.
    pub fn decode(&self, received_at: Instant) -> RouterAdvertisementEvent {
        let mut event = RouterAdvertisementEvent {
            source: self.source,
            prefixes: Vec::new(),
            routes: Vec::new(),
            received_at,
            skipped: Vec::new(),
        };

        for option in self.ra.options() {
            let option = match option {
                Ok(option) => option,
                Err(error) => {
                    event.skipped.push(SkippedOption {
                        option_type: None,
                        error,
                    });
                    continue;
                }
            };

            match NdpOptionType::from_u8(option.option_type) {
                Some(NdpOptionType::PrefixInformation) => {
                    match PrefixInformation::parse(option.bytes) {
                        Ok(pio) => event.prefixes.push(PrefixOption {
                            prefix: mask_prefix(&pio.prefix, pio.prefix_length),
                            prefix_length: pio.prefix_length,
                        }),
                        Err(error) => event.skipped.push(SkippedOption {
                            option_type: Some(option.option_type),
                            error,
                        }),
                    }
                }
                Some(NdpOptionType::RouteInformation) => {
                    match RouteInformation::parse(option.bytes) {
                        Ok(rio) => event.routes.push(RouteOption {
                            prefix: mask_prefix(&rio.prefix, rio.prefix_length),
                            prefix_length: rio.prefix_length,
                            preference: rio.preference,
                        }),
                        Err(error) => event.skipped.push(SkippedOption {
                            option_type: Some(option.option_type),
                            error,
                        }),
                    }
                }
                _ => {}
            }
        }

        event
    }
}

/// Confirm `frame` is an Ethernet/IPv6/ICMPv6 Router Advertisement.
pub fn classify(frame: &[u8]) -> Result<RaFrame<'_>, NotAnRa> {
    let eth = Frame::parse(frame).map_err(|_| NotAnRa::Truncated)?;
    if !eth.is_ipv6() {
        return Err(NotAnRa::NotIpv6 {
            ethertype: eth.ethertype(),
        });
    }

    let ip = Ipv6Header::parse(eth.payload()).map_err(|e| NotAnRa::MalformedIpv6(e.to_string()))?;
    let (next_header, message) = ip
        .upper_layer()
        .map_err(|e| NotAnRa::MalformedIpv6(e.to_string()))?;
    if next_header != NextHeader::Icmpv6 as u8 {
        return Err(NotAnRa::NotIcmpv6 { next_header });
    }

    match message.first() {
        Some(&t) if t == Icmpv6Type::RouterAdvertisement as u8 => {}
        Some(&msg_type) => return Err(NotAnRa::OtherMessage { msg_type }),
        None => return Err(NotAnRa::ShortMessage { len: 0 }),
    }

    let ra = RouterAdvertisement::parse(message).map_err(|_| NotAnRa::ShortMessage {
        len: message.len(),
    })?;
    if message[1] != 0 {
        return Err(NotAnRa::BadCode { code: message[1] });
    }

    let source = ip.src_addr();
    if !icmpv6::validate_checksum(&source, &ip.dst_addr(), message) {
        return Err(NotAnRa::BadChecksum);
    }

    Ok(RaFrame { source, ra })
}

/// Classify and decode in one step.
pub fn decode(frame: &[u8], received_at: Instant) -> Result<RouterAdvertisementEvent, NotAnRa> {
    classify(frame).map(|ra| ra.decode(received_at))
}
