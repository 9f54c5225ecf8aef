//! Command dispatcher for broadcasting commands to devices

use actuator_shared::{codec, CommandMessage};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, Instant};
use tracing::info;

/// Sends `start`/`stop` datagrams to the device port on a broadcast address
pub struct CommandDispatcher {
    socket: UdpSocket,
    target: SocketAddr,
    spacing: Duration,
}

impl CommandDispatcher {
    /// Create a dispatcher sending to `target`, pausing `spacing` between packets
    pub async fn bind(target: SocketAddr, spacing: Duration) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("failed to bind dispatcher socket")?;
        socket
            .set_broadcast(true)
            .context("failed to enable SO_BROADCAST")?;
        Ok(Self {
            socket,
            target,
            spacing,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    async fn send(&self, message: &CommandMessage) -> Result<()> {
        let payload = codec::encode_command(message)?;
        self.socket
            .send_to(&payload, self.target)
            .await
            .with_context(|| format!("failed to send to {}", self.target))?;
        Ok(())
    }

    /// Broadcast one `start` per `(seq, delay_ms)` pair.
    ///
    /// Returns the instant the first packet went out, which is what ack
    /// latency is measured from.
    pub async fn broadcast_start(&self, session: u64, seq_delays: &[(i64, u64)]) -> Result<Instant> {
        let started = Instant::now();
        for &(seq, delay_ms) in seq_delays {
            let message = CommandMessage::Start {
                seq,
                delay_ms,
                session: Some(session),
            };
            self.send(&message).await?;
            info!("[COORD] -> START {:?}", message);
            sleep(self.spacing).await;
        }
        Ok(started)
    }

    /// Broadcast `stop` `tries` times; there is no ack for stop, so repetition
    /// is the only protection against loss
    pub async fn broadcast_stop(&self, reason: &str, tries: u32) -> Result<()> {
        let message = CommandMessage::Stop {
            reason: Some(reason.to_string()),
        };
        for attempt in 1..=tries {
            self.send(&message).await?;
            info!("[COORD] -> STOP x{} {:?}", attempt, message);
            sleep(self.spacing).await;
        }
        Ok(())
    }
}
