//! IPv6 protocol - RFC 8200

use crate::{Error, Result};
use std::net::Ipv6Addr;

/// IPv6 header size (fixed, unlike IPv4)
pub const HEADER_SIZE: usize = 40;

/// All-nodes link-local multicast group
pub const ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);
/// All-routers link-local multicast group
pub const ALL_ROUTERS: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 2);

/// Upper bound on chained extension headers before giving up
const MAX_EXTENSION_HEADERS: usize = 8;

/// IPv6 next header values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NextHeader {
    HopByHop = 0,
    Routing = 43,
    Fragment = 44,
    Icmpv6 = 58,
    NoNextHeader = 59,
    DestinationOptions = 60,
}

impl NextHeader {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(NextHeader::HopByHop),
            43 => Some(NextHeader::Routing),
            44 => Some(NextHeader::Fragment),
            58 => Some(NextHeader::Icmpv6),
            59 => Some(NextHeader::NoNextHeader),
            60 => Some(NextHeader::DestinationOptions),
            _ => None,
        }
    }
}

/// Parsed IPv6 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv6Header<'a> {
    buffer: &'a [u8],
}

impl<'a> Ipv6Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("IPv6 header too short".into()));
        }

        let version = buffer[0] >> 4;
        if version != 6 {
            return Err(Error::Parse("not an IPv6 packet".into()));
        }

        Ok(Self { buffer })
    }

    /// Payload Length (does not include header)
    pub fn payload_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// Next Header (protocol)
    pub fn next_header(&self) -> u8 {
        self.buffer[6]
    }

    /// Hop Limit
    pub fn hop_limit(&self) -> u8 {
        self.buffer[7]
    }

    /// Source Address
    pub fn src_addr(&self) -> Ipv6Addr {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.buffer[8..24]);
        Ipv6Addr::from(bytes)
    }

    /// Destination Address
    pub fn dst_addr(&self) -> Ipv6Addr {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.buffer[24..40]);
        Ipv6Addr::from(bytes)
    }

    /// Payload (after header), clipped to the advertised payload length.
    ///
    /// Ethernet pads short frames, so trailing bytes beyond the payload
    /// length are not part of the packet.
    pub fn payload(&self) -> &'a [u8] {
        let end = (HEADER_SIZE + self.payload_length() as usize).min(self.buffer.len());
        &self.buffer[HEADER_SIZE..end]
    }

    /// Skip Hop-by-Hop, Routing and Destination Options headers.
    ///
    /// Returns the upper-layer protocol number and its payload. Fragments are
    /// reported as-is (protocol 44) since ND messages are never fragmented.
    pub fn upper_layer(&self) -> Result<(u8, &'a [u8])> {
        let mut next = self.next_header();
        let mut rest = self.payload();

        for _ in 0..MAX_EXTENSION_HEADERS {
            match NextHeader::from_u8(next) {
                Some(NextHeader::HopByHop)
                | Some(NextHeader::Routing)
                | Some(NextHeader::DestinationOptions) => {
                    if rest.len() < 8 {
                        return Err(Error::Parse("truncated extension header".into()));
                    }
                    // Hdr Ext Len counts 8-octet units beyond the first
                    let len = (rest[1] as usize + 1) * 8;
                    if rest.len() < len {
                        return Err(Error::Parse("truncated extension header".into()));
                    }
                    next = rest[0];
                    rest = &rest[len..];
                }
                _ => return Ok((next, rest)),
            }
        }

        Err(Error::Parse("too many extension headers".into()))
    }
}

/// Builder for constructing IPv6 packets
#[derive(Debug, Clone)]
pub struct Ipv6Builder {
    next_header: u8,
    hop_limit: u8,
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
    payload: Vec<u8>,
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Self {
            next_header: NextHeader::NoNextHeader as u8,
            hop_limit: 64,
            src_addr: Ipv6Addr::UNSPECIFIED,
            dst_addr: Ipv6Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    pub fn next_header(mut self, nh: u8) -> Self {
        self.next_header = nh;
        self
    }

    pub fn hop_limit(mut self, hl: u8) -> Self {
        self.hop_limit = hl;
        self
    }

    pub fn src_addr(mut self, addr: Ipv6Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv6Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let payload_length = self.payload.len() as u16;
        let mut buffer = vec![0u8; HEADER_SIZE + self.payload.len()];

        // Version 6, traffic class and flow label zero
        buffer[0] = 0x60;
        buffer[4..6].copy_from_slice(&payload_length.to_be_bytes());
        buffer[6] = self.next_header;
        buffer[7] = self.hop_limit;
        buffer[8..24].copy_from_slice(&self.src_addr.octets());
        buffer[24..40].copy_from_slice(&self.dst_addr.octets());
        buffer[HEADER_SIZE..].copy_from_slice(&self.payload);

        buffer
    }
}

impl Default for Ipv6Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Clear every bit past `prefix_len`, yielding the network address.
pub fn mask_prefix(addr: &Ipv6Addr, prefix_len: u8) -> Ipv6Addr {
    let len = prefix_len.min(128) as u32;
    let bits = u128::from(*addr);
    let mask = if len == 0 { 0 } else { u128::MAX << (128 - len) };
    Ipv6Addr::from(bits & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_icmpv6_packet() -> Vec<u8> {
        Ipv6Builder::new()
            .next_header(NextHeader::Icmpv6 as u8)
            .hop_limit(255)
            .src_addr("fe80::1".parse().unwrap())
            .dst_addr(ALL_NODES)
            .payload(&[0x86, 0x00, 0x00, 0x00, 0x40, 0x00, 0x07, 0x08])
            .build()
    }

    #[test]
    fn test_next_header_from_u8() {
        assert_eq!(NextHeader::from_u8(0), Some(NextHeader::HopByHop));
        assert_eq!(NextHeader::from_u8(58), Some(NextHeader::Icmpv6));
        assert_eq!(NextHeader::from_u8(60), Some(NextHeader::DestinationOptions));
        assert_eq!(NextHeader::from_u8(6), None);
    }

    #[test]
    fn test_parse_built_packet() {
        let data = make_icmpv6_packet();
        let hdr = Ipv6Header::parse(&data).unwrap();

        assert_eq!(hdr.payload_length(), 8);
        assert_eq!(hdr.next_header(), 58);
        assert_eq!(hdr.hop_limit(), 255);
        assert_eq!(hdr.src_addr(), "fe80::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(hdr.dst_addr(), ALL_NODES);
        assert_eq!(hdr.payload().len(), 8);
    }

    #[test]
    fn test_parse_too_short() {
        let short = vec![0u8; 39];
        assert!(Ipv6Header::parse(&short).is_err());
    }

    #[test]
    fn test_parse_wrong_version() {
        let mut data = make_icmpv6_packet();
        data[0] = 0x45;
        assert!(Ipv6Header::parse(&data).is_err());
    }

    #[test]
    fn test_payload_ignores_ethernet_padding() {
        let mut data = make_icmpv6_packet();
        data.extend_from_slice(&[0u8; 6]);
        let hdr = Ipv6Header::parse(&data).unwrap();
        assert_eq!(hdr.payload().len(), 8);
    }

    #[test]
    fn test_upper_layer_direct() {
        let data = make_icmpv6_packet();
        let hdr = Ipv6Header::parse(&data).unwrap();
        let (proto, payload) = hdr.upper_layer().unwrap();
        assert_eq!(proto, NextHeader::Icmpv6 as u8);
        assert_eq!(payload[0], 0x86);
    }

    #[test]
    fn test_upper_layer_skips_hop_by_hop() {
        let mut payload = vec![
            58, 0, // next header ICMPv6, length 0 (8 bytes)
            0x05, 0x02, 0x00, 0x00, // router alert
            0x01, 0x00, // PadN
        ];
        payload.extend_from_slice(&[0x86, 0x00, 0x00, 0x00]);
        let data = Ipv6Builder::new()
            .next_header(NextHeader::HopByHop as u8)
            .payload(&payload)
            .build();

        let hdr = Ipv6Header::parse(&data).unwrap();
        let (proto, rest) = hdr.upper_layer().unwrap();
        assert_eq!(proto, 58);
        assert_eq!(rest, &[0x86, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_upper_layer_truncated_extension() {
        let data = Ipv6Builder::new()
            .next_header(NextHeader::HopByHop as u8)
            .payload(&[58, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let hdr = Ipv6Header::parse(&data).unwrap();
        assert!(hdr.upper_layer().is_err());
    }

    #[test]
    fn test_mask_prefix() {
        let addr: Ipv6Addr = "fd00:abcd:1:2:3:4:5:6".parse().unwrap();
        assert_eq!(
            mask_prefix(&addr, 64),
            "fd00:abcd:1:2::".parse::<Ipv6Addr>().unwrap()
        );
        assert_eq!(
            mask_prefix(&addr, 8),
            "fd00::".parse::<Ipv6Addr>().unwrap()
        );
        assert_eq!(mask_prefix(&addr, 0), Ipv6Addr::UNSPECIFIED);
        assert_eq!(mask_prefix(&addr, 128), addr);
    }
}
