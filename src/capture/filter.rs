//! Classic BPF program restricting capture to Router Advertisements

/// pcap-style expression equivalent to [`router_advertisement_filter`]
pub const CAPTURE_FILTER: &str = "icmp6 and ip6[40] = 134";

// BPF opcodes (linux/filter.h)
const BPF_LD_H_ABS: u16 = 0x28;
const BPF_LD_B_ABS: u16 = 0x30;
const BPF_JMP_JEQ_K: u16 = 0x15;
const BPF_RET_K: u16 = 0x06;

/// Ethernet offsets for the fields the filter inspects
const OFF_ETHERTYPE: u32 = 12;
const OFF_NEXT_HEADER: u32 = 14 + 6;
const OFF_ICMPV6_TYPE: u32 = 14 + 40;

const ETHERTYPE_IPV6: u32 = 0x86DD;
const PROTO_ICMPV6: u32 = 58;
const ICMPV6_ROUTER_ADVERTISEMENT: u32 = 134;

/// Snap length returned for accepted frames
const ACCEPT_LEN: u32 = 0x0004_0000;

fn stmt(code: u16, k: u32) -> libc::sock_filter {
    libc::sock_filter {
        code,
        jt: 0,
        jf: 0,
        k,
    }
}

fn jump(code: u16, k: u32, jt: u8, jf: u8) -> libc::sock_filter {
    libc::sock_filter { code, jt, jf, k }
}

/// Build the filter: IPv6 ethertype, next header ICMPv6, ICMPv6 type 134.
///
/// Like the pcap expression it only matches RAs without extension headers;
/// the decoder re-validates every frame regardless.
pub fn router_advertisement_filter() -> Vec<libc::sock_filter> {
    vec![
        stmt(BPF_LD_H_ABS, OFF_ETHERTYPE),
        jump(BPF_JMP_JEQ_K, ETHERTYPE_IPV6, 0, 5),
        stmt(BPF_LD_B_ABS, OFF_NEXT_HEADER),
        jump(BPF_JMP_JEQ_K, PROTO_ICMPV6, 0, 3),
        stmt(BPF_LD_B_ABS, OFF_ICMPV6_TYPE),
        jump(BPF_JMP_JEQ_K, ICMPV6_ROUTER_ADVERTISEMENT, 0, 1),
        stmt(BPF_RET_K, ACCEPT_LEN),
        stmt(BPF_RET_K, 0),
    ]
}
