//! Acknowledgement of accepted commands
//!
//! An ack confirms acceptance, not completion. It goes to the IP of the
//! command's sender on the configured ack port, is sent at most once and is
//! never retried.

use crate::error::SendError;
use crate::stats::DeviceStats;
use crate::transport::DatagramTransport;
use actuator_shared::codec;
use actuator_shared::{Ack, SenderAddress};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

pub struct AckSender {
    transport: Arc<dyn DatagramTransport>,
    client_id: String,
    ack_port: u16,
    stats: Arc<DeviceStats>,
}

impl AckSender {
    pub fn new(
        transport: Arc<dyn DatagramTransport>,
        client_id: impl Into<String>,
        ack_port: u16,
        stats: Arc<DeviceStats>,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            ack_port,
            stats,
        }
    }

    /// Where an ack for a command from `sender` is delivered
    pub fn ack_destination(&self, sender: SenderAddress) -> SocketAddr {
        SocketAddr::new(sender.ip(), self.ack_port)
    }

    pub fn encode(&self, seq: i64) -> Result<Bytes, SendError> {
        Ok(codec::encode_ack(&Ack::accepted(&self.client_id, seq))?)
    }

    /// Ack `seq` back to the device that sent the command
    pub async fn send_ack(&self, target: SenderAddress, seq: i64) -> Result<(), SendError> {
        let destination = self.ack_destination(target);
        let result = match self.encode(seq) {
            Ok(payload) => self.transport.send_to(destination, &payload).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                DeviceStats::incr(&self.stats.acks_sent);
                debug!("[ACK] seq={} -> {}", seq, destination);
            }
            Err(_) => DeviceStats::incr(&self.stats.ack_failures),
        }
        result
    }
}
