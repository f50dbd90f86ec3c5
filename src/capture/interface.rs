//! Host interface enumeration

use crate::protocol::MacAddr;
use crate::{Error, Result};
use pnet_datalink::NetworkInterface;
use std::net::{IpAddr, Ipv6Addr};
use std::path::Path;

const SYS_CLASS_NET: &str = "/sys/class/net";

/// Names of the network interfaces present on this host, sorted
pub fn list_interfaces() -> Vec<String> {
    let mut names: Vec<String> = pnet_datalink::interfaces()
        .into_iter()
        .map(|iface| iface.name)
        .collect();
    names.sort();
    names
}

fn find_interface(name: &str) -> Option<NetworkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
}

/// Fail with [`Error::InterfaceNotFound`] unless `name` exists
pub fn validate_interface(name: &str) -> Result<()> {
    check_interface(name, &list_interfaces())
}

fn check_interface(name: &str, available: &[String]) -> Result<()> {
    if available.iter().any(|n| n == name) {
        Ok(())
    } else {
        Err(Error::InterfaceNotFound {
            name: name.to_string(),
        })
    }
}

/// MAC address of `name`, if it has one
pub fn interface_mac(name: &str) -> Option<MacAddr> {
    let path = Path::new(SYS_CLASS_NET).join(name).join("address");
    let content = std::fs::read_to_string(path).ok()?;
    let mac: MacAddr = content.parse().ok()?;
    (!mac.is_zero()).then_some(mac)
}

/// First link-local address configured on `name`
pub fn link_local_address(name: &str) -> Option<Ipv6Addr> {
    let iface = find_interface(name)?;
    first_link_local(iface.ips.iter().map(|network| network.ip()))
}

/// First `fe80::/10` address in `ips`
fn first_link_local(ips: impl IntoIterator<Item = IpAddr>) -> Option<Ipv6Addr> {
    ips.into_iter().find_map(|ip| match ip {
        IpAddr::V6(addr) if addr.is_unicast_link_local() => Some(addr),
        _ => None,
    })
}
