//! Wire formats needed to observe Router Advertisements and emit Router Solicitations

pub mod ethernet;
pub mod icmpv6;
pub mod ipv6;
pub mod types;

pub use types::*;

use std::net::Ipv6Addr;

/// Wrap an ICMPv6 message in IPv6 and Ethernet headers, filling in the checksum.
pub fn icmpv6_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
    hop_limit: u8,
    mut message: Vec<u8>,
) -> Vec<u8> {
    icmpv6::set_checksum(&mut message, &src_addr, &dst_addr);

    let packet = ipv6::Ipv6Builder::new()
        .next_header(ipv6::NextHeader::Icmpv6 as u8)
        .hop_limit(hop_limit)
        .src_addr(src_addr)
        .dst_addr(dst_addr)
        .payload(&message)
        .build();

    ethernet::FrameBuilder::new()
        .dst_mac(dst_mac)
        .src_mac(src_mac)
        .ethertype(EtherType::Ipv6 as u16)
        .payload(&packet)
        .build()
}
