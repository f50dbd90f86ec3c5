//! ICMPv6 protocol - RFC 4443, NDP - RFC 4861, Route Information - RFC 4191

use super::MacAddr;
use crate::{Error, Result};
use std::fmt;
use std::net::Ipv6Addr;

/// Router Advertisement message size without options
pub const RA_HEADER_SIZE: usize = 16;

/// Router Solicitation message size without options
pub const RS_HEADER_SIZE: usize = 8;

/// Prefix Information option size (fixed, RFC 4861 section 4.6.2)
pub const PREFIX_INFO_SIZE: usize = 32;

/// NDP options are sized in units of 8 octets
const OPTION_UNIT: usize = 8;

/// ICMPv6 message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Icmpv6Type {
    EchoRequest = 128,
    EchoReply = 129,
    RouterSolicitation = 133,
    RouterAdvertisement = 134,
    NeighborSolicitation = 135,
    NeighborAdvertisement = 136,
    Redirect = 137,
}

impl Icmpv6Type {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            128 => Some(Icmpv6Type::EchoRequest),
            129 => Some(Icmpv6Type::EchoReply),
            133 => Some(Icmpv6Type::RouterSolicitation),
            134 => Some(Icmpv6Type::RouterAdvertisement),
            135 => Some(Icmpv6Type::NeighborSolicitation),
            136 => Some(Icmpv6Type::NeighborAdvertisement),
            137 => Some(Icmpv6Type::Redirect),
            _ => None,
        }
    }
}

/// NDP option types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NdpOptionType {
    SourceLinkLayerAddress = 1,
    TargetLinkLayerAddress = 2,
    PrefixInformation = 3,
    RedirectedHeader = 4,
    Mtu = 5,
    RouteInformation = 24,
    RecursiveDnsServer = 25,
    DnsSearchList = 31,
}

impl NdpOptionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NdpOptionType::SourceLinkLayerAddress),
            2 => Some(NdpOptionType::TargetLinkLayerAddress),
            3 => Some(NdpOptionType::PrefixInformation),
            4 => Some(NdpOptionType::RedirectedHeader),
            5 => Some(NdpOptionType::Mtu),
            24 => Some(NdpOptionType::RouteInformation),
            25 => Some(NdpOptionType::RecursiveDnsServer),
            31 => Some(NdpOptionType::DnsSearchList),
            _ => None,
        }
    }
}

/// Why a single NDP option could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("option with zero length")]
    ZeroLength,

    #[error("option truncated: needs {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("option type {option_type} has invalid length {len}")]
    BadLength { option_type: u8, len: usize },

    #[error("prefix length {prefix_length} exceeds {max} for this option")]
    PrefixLength { prefix_length: u8, max: u8 },
}

/// Router Advertisement message (zero-copy reference, RFC 4861 section 4.2)
#[derive(Debug)]
pub struct RouterAdvertisement<'a> {
    buffer: &'a [u8],
}

impl<'a> RouterAdvertisement<'a> {
    /// Parse from a full ICMPv6 message (type/code/checksum included)
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < RA_HEADER_SIZE {
            return Err(Error::Parse("Router Advertisement too short".into()));
        }
        if buffer[0] != Icmpv6Type::RouterAdvertisement as u8 {
            return Err(Error::InvalidPacket("not a Router Advertisement".into()));
        }

        Ok(Self { buffer })
    }

    /// Iterate the options area
    pub fn options(&self) -> NdOptions<'a> {
        NdOptions {
            buffer: &self.buffer[RA_HEADER_SIZE..],
            offset: 0,
            done: false,
        }
    }
}

/// A raw NDP option: type plus the whole option bytes (type and length included)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdOption<'a> {
    pub option_type: u8,
    pub bytes: &'a [u8],
}

/// Iterator over NDP options.
///
/// A zero-length or truncated option makes the rest of the area unwalkable,
/// so the iterator yields the error once and then stops.
#[derive(Debug)]
pub struct NdOptions<'a> {
    buffer: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Iterator for NdOptions<'a> {
    type Item = std::result::Result<NdOption<'a>, OptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buffer.len() {
            return None;
        }

        let rest = &self.buffer[self.offset..];
        if rest.len() < 2 {
            self.done = true;
            return Some(Err(OptionError::Truncated {
                needed: 2,
                available: rest.len(),
            }));
        }

        let opt_len = rest[1] as usize * OPTION_UNIT;
        if opt_len == 0 {
            self.done = true;
            return Some(Err(OptionError::ZeroLength));
        }
        if opt_len > rest.len() {
            self.done = true;
            return Some(Err(OptionError::Truncated {
                needed: opt_len,
                available: rest.len(),
            }));
        }

        self.offset += opt_len;
        Some(Ok(NdOption {
            option_type: rest[0],
            bytes: &rest[..opt_len],
        }))
    }
}

/// Prefix Information option (RFC 4861 section 4.6.2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixInformation {
    pub prefix_length: u8,
    pub on_link_flag: bool,
    pub autonomous_flag: bool,
    pub valid_lifetime: u32,
    pub preferred_lifetime: u32,
    pub prefix: Ipv6Addr,
}

impl PrefixInformation {
    pub fn new(
        prefix: Ipv6Addr,
        prefix_length: u8,
        on_link_flag: bool,
        autonomous_flag: bool,
        valid_lifetime: u32,
        preferred_lifetime: u32,
    ) -> Self {
        Self {
            prefix_length,
            on_link_flag,
            autonomous_flag,
            valid_lifetime,
            preferred_lifetime,
            prefix,
        }
    }

    /// Parse from the whole option bytes
    pub fn parse(option: &[u8]) -> std::result::Result<Self, OptionError> {
        if option.len() != PREFIX_INFO_SIZE {
            return Err(OptionError::BadLength {
                option_type: NdpOptionType::PrefixInformation as u8,
                len: option.len(),
            });
        }

        let prefix_length = option[2];
        if prefix_length > 128 {
            return Err(OptionError::PrefixLength {
                prefix_length,
                max: 128,
            });
        }

        let flags = option[3];
        let valid_lifetime = u32::from_be_bytes([option[4], option[5], option[6], option[7]]);
        let preferred_lifetime = u32::from_be_bytes([option[8], option[9], option[10], option[11]]);
        // 4 reserved bytes, then the prefix
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&option[16..32]);

        Ok(Self {
            prefix_length,
            on_link_flag: flags & 0x80 != 0,
            autonomous_flag: flags & 0x40 != 0,
            valid_lifetime,
            preferred_lifetime,
            prefix: Ipv6Addr::from(prefix),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PREFIX_INFO_SIZE];
        buf[0] = NdpOptionType::PrefixInformation as u8;
        buf[1] = (PREFIX_INFO_SIZE / OPTION_UNIT) as u8;
        buf[2] = self.prefix_length;
        let mut flags = 0u8;
        if self.on_link_flag {
            flags |= 0x80;
        }
        if self.autonomous_flag {
            flags |= 0x40;
        }
        buf[3] = flags;
        buf[4..8].copy_from_slice(&self.valid_lifetime.to_be_bytes());
        buf[8..12].copy_from_slice(&self.preferred_lifetime.to_be_bytes());
        buf[16..32].copy_from_slice(&self.prefix.octets());
        buf
    }
}

/// Default router / route preference (RFC 4191 section 2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePreference {
    High,
    Medium,
    Low,
}

impl RoutePreference {
    /// Decode the 2-bit Prf field; the reserved value `10` yields `None`
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x03 {
            0b01 => Some(RoutePreference::High),
            0b00 => Some(RoutePreference::Medium),
            0b11 => Some(RoutePreference::Low),
            _ => None,
        }
    }

    pub fn to_bits(self) -> u8 {
        match self {
            RoutePreference::High => 0b01,
            RoutePreference::Medium => 0b00,
            RoutePreference::Low => 0b11,
        }
    }
}

impl fmt::Display for RoutePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePreference::High => write!(f, "high"),
            RoutePreference::Medium => write!(f, "medium"),
            RoutePreference::Low => write!(f, "low"),
        }
    }
}

/// Route Information option (RFC 4191 section 2.3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInformation {
    pub prefix_length: u8,
    pub preference: Option<RoutePreference>,
    pub route_lifetime: u32,
    pub prefix: Ipv6Addr,
}

impl RouteInformation {
    pub fn new(
        prefix: Ipv6Addr,
        prefix_length: u8,
        preference: RoutePreference,
        route_lifetime: u32,
    ) -> Self {
        Self {
            prefix_length,
            preference: Some(preference),
            route_lifetime,
            prefix,
        }
    }

    /// Parse from the whole option bytes.
    ///
    /// The prefix field is variable length: option Length 1, 2 or 3 carries
    /// 0, 8 or 16 prefix bytes. Missing bytes are zero. A Prefix Length that
    /// needs more bits than the option carries is rejected.
    pub fn parse(option: &[u8]) -> std::result::Result<Self, OptionError> {
        let units = option.len() / OPTION_UNIT;
        if !(1..=3).contains(&units) || option.len() % OPTION_UNIT != 0 {
            return Err(OptionError::BadLength {
                option_type: NdpOptionType::RouteInformation as u8,
                len: option.len(),
            });
        }

        let prefix_length = option[2];
        let carried_bits = ((units - 1) * 64) as u8;
        if prefix_length > 128 || prefix_length > carried_bits {
            return Err(OptionError::PrefixLength {
                prefix_length,
                max: carried_bits,
            });
        }

        let preference = RoutePreference::from_bits(option[3] >> 3);
        let route_lifetime = u32::from_be_bytes([option[4], option[5], option[6], option[7]]);

        let mut prefix = [0u8; 16];
        let carried = &option[8..];
        prefix[..carried.len()].copy_from_slice(carried);

        Ok(Self {
            prefix_length,
            preference,
            route_lifetime,
            prefix: Ipv6Addr::from(prefix),
        })
    }

    /// Encode with the shortest Length that carries the prefix
    pub fn to_bytes(&self) -> Vec<u8> {
        let units: usize = match self.prefix_length {
            0 => 1,
            1..=64 => 2,
            _ => 3,
        };
        let mut buf = vec![0u8; units * OPTION_UNIT];
        buf[0] = NdpOptionType::RouteInformation as u8;
        buf[1] = units as u8;
        buf[2] = self.prefix_length;
        // Reserved value 10 when no preference is set
        let prf = self.preference.map_or(0b10, RoutePreference::to_bits);
        buf[3] = prf << 3;
        buf[4..8].copy_from_slice(&self.route_lifetime.to_be_bytes());
        let prefix_bytes = (units - 1) * OPTION_UNIT;
        buf[8..].copy_from_slice(&self.prefix.octets()[..prefix_bytes]);
        buf
    }
}

/// Builder for Router Advertisement messages
#[derive(Debug, Clone, Default)]
pub struct RouterAdvertisementBuilder {
    cur_hop_limit: u8,
    router_lifetime: u16,
    options: Vec<u8>,
}

impl RouterAdvertisementBuilder {
    pub fn new(cur_hop_limit: u8, router_lifetime: u16) -> Self {
        Self {
            cur_hop_limit,
            router_lifetime,
            options: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: &PrefixInformation) -> Self {
        self.options.extend_from_slice(&prefix.to_bytes());
        self
    }

    pub fn route(mut self, route: &RouteInformation) -> Self {
        self.options.extend_from_slice(&route.to_bytes());
        self
    }

    pub fn source_link_addr(mut self, mac: MacAddr) -> Self {
        self.options
            .extend_from_slice(&link_layer_option(NdpOptionType::SourceLinkLayerAddress, mac));
        self
    }

    /// Append pre-encoded option bytes verbatim
    pub fn raw_option(mut self, bytes: &[u8]) -> Self {
        self.options.extend_from_slice(bytes);
        self
    }

    /// Build RA message bytes (ICMPv6 payload, checksum left zero)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; RA_HEADER_SIZE];
        buf[0] = Icmpv6Type::RouterAdvertisement as u8;
        buf[4] = self.cur_hop_limit;
        buf[6..8].copy_from_slice(&self.router_lifetime.to_be_bytes());
        buf.extend_from_slice(&self.options);
        buf
    }
}

/// Router Solicitation message (RFC 4861 section 4.1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSolicitation {
    pub source_link_addr: Option<MacAddr>,
}

impl RouterSolicitation {
    pub fn new(source_link_addr: Option<MacAddr>) -> Self {
        Self { source_link_addr }
    }

    /// Build RS message bytes (ICMPv6 payload, checksum left zero)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; RS_HEADER_SIZE];
        buf[0] = Icmpv6Type::RouterSolicitation as u8;

        if let Some(mac) = self.source_link_addr {
            buf.extend_from_slice(&link_layer_option(
                NdpOptionType::SourceLinkLayerAddress,
                mac,
            ));
        }

        buf
    }
}

fn link_layer_option(option_type: NdpOptionType, mac: MacAddr) -> [u8; 8] {
    let mut opt = [0u8; 8];
    opt[0] = option_type as u8;
    opt[1] = 1;
    opt[2..8].copy_from_slice(&mac.0);
    opt
}

/// Sum the IPv6 pseudo-header and message as 16-bit words, folded to 16 bits
fn checksum_sum(src_addr: &Ipv6Addr, dst_addr: &Ipv6Addr, icmpv6_data: &[u8]) -> u32 {
    let mut sum: u32 = 0;

    for chunk in src_addr.octets().chunks(2) {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }
    for chunk in dst_addr.octets().chunks(2) {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }

    // Upper-layer packet length and next header (ICMPv6 = 58)
    let length = icmpv6_data.len() as u32;
    sum = sum.wrapping_add(length >> 16);
    sum = sum.wrapping_add(length & 0xFFFF);
    sum = sum.wrapping_add(58);

    for chunk in icmpv6_data.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        sum = sum.wrapping_add(word as u32);
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum
}

/// Set checksum in ICMPv6 message buffer
pub fn set_checksum(buffer: &mut [u8], src_addr: &Ipv6Addr, dst_addr: &Ipv6Addr) {
    buffer[2] = 0;
    buffer[3] = 0;

    let checksum = !(checksum_sum(src_addr, dst_addr, buffer) as u16);
    buffer[2..4].copy_from_slice(&checksum.to_be_bytes());
}

/// Validate ICMPv6 checksum
pub fn validate_checksum(src_addr: &Ipv6Addr, dst_addr: &Ipv6Addr, icmpv6_data: &[u8]) -> bool {
    checksum_sum(src_addr, dst_addr, icmpv6_data) == 0xFFFF
}
