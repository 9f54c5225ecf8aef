//! UDP transport implementation

use crate::error::SendError;
use crate::transport::traits::DatagramTransport;
use actuator_shared::defaults::MAX_DATAGRAM_SIZE;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// UDP socket wrapper implementing DatagramTransport
///
/// One socket serves both directions: the listener receives on it while the
/// controller sends acks and triggers from it.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind to `addr`. Failure here is a startup failure for the device.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind UDP socket on {}", addr))?;
        // Commands arrive as broadcasts
        socket
            .set_broadcast(true)
            .context("failed to enable SO_BROADCAST")?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn recv_from(&self) -> io::Result<(Bytes, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (n, from) = self.socket.recv_from(&mut buf).await?;
            if n > 0 {
                return Ok((Bytes::copy_from_slice(&buf[..n]), from));
            }
        }
    }

    async fn send_to(&self, target: SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        let sent = self
            .socket
            .send_to(payload, target)
            .await
            .map_err(|source| SendError::Io { target, source })?;

        if sent != payload.len() {
            return Err(SendError::Truncated {
                target,
                sent,
                len: payload.len(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}
