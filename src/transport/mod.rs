pub mod traits;
pub mod udp;

#[cfg(test)]
pub mod fake;

pub use traits::DatagramTransport;
pub use udp::UdpTransport;
