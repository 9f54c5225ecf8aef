//! Broadcast address discovery

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::warn;

/// Subnet broadcast for a /24: the host address with its last octet set to 255
pub fn broadcast_for(ip: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = ip.octets();
    Ipv4Addr::new(a, b, c, 255)
}

/// Find the local IPv4 address used for outbound traffic and derive its
/// broadcast address. Falls back to the limited broadcast address.
pub fn discover_broadcast_ip() -> Ipv4Addr {
    match local_ipv4() {
        Ok(ip) => broadcast_for(ip),
        Err(e) => {
            warn!("[COORD] could not determine local IP ({}), using 255.255.255.255", e);
            Ipv4Addr::BROADCAST
        }
    }
}

fn local_ipv4() -> std::io::Result<Ipv4Addr> {
    // Connecting a UDP socket sends nothing but makes the OS pick a route
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Ok(ip),
        other => Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no usable IPv4 address ({})", other),
        )),
    }
}
