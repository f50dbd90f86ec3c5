//! Unique Local Address filter

use std::net::Ipv6Addr;

/// Top byte of the locally assigned half of `fc00::/7`
const ULA_LOCAL_BYTE: u8 = 0xfd;

/// True iff `prefix` lies in `fd00::/8`. The `fc00::/8` half is rejected.
pub fn is_ula(prefix: &Ipv6Addr) -> bool {
    prefix.octets()[0] == ULA_LOCAL_BYTE
}
