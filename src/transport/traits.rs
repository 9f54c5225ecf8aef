//! Datagram transport abstraction for pluggable network backends

use crate::error::SendError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;

/// A bound, bidirectional datagram endpoint
#[async_trait]
pub trait DatagramTransport: Send + Sync + 'static {
    /// Wait for the next non-empty datagram and the address it came from
    async fn recv_from(&self) -> io::Result<(Bytes, SocketAddr)>;

    /// Send one datagram to `target`
    async fn send_to(&self, target: SocketAddr, payload: &[u8]) -> Result<(), SendError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
