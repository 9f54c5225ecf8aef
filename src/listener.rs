//! Datagram listener
//!
//! Owns the receive loop. Each datagram is decoded and handed to the
//! controller over an ordered channel; anything that does not decode is
//! dropped. The loop only ever waits on the network (and the shutdown
//! signal): it never looks at session state and never waits on the
//! controller, so a countdown in progress cannot delay reception.

use crate::signal::ShutdownListener;
use crate::stats::DeviceStats;
use crate::transport::DatagramTransport;
use actuator_shared::{codec, Command, SenderAddress};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Consecutive receive errors tolerated before the transport is declared dead
pub const MAX_CONSECUTIVE_RECV_ERRORS: u32 = 16;

/// A decoded command and the address it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundCommand {
    pub command: Command,
    pub sender: SenderAddress,
}

pub struct Listener {
    transport: Arc<dyn DatagramTransport>,
    commands: mpsc::Sender<InboundCommand>,
    stats: Arc<DeviceStats>,
}

impl Listener {
    pub fn new(
        transport: Arc<dyn DatagramTransport>,
        commands: mpsc::Sender<InboundCommand>,
        stats: Arc<DeviceStats>,
    ) -> Self {
        Self {
            transport,
            commands,
            stats,
        }
    }

    /// Run until shutdown. Dropping the listener closes the command channel,
    /// which is what stops the controller.
    pub async fn run(self, mut shutdown: ShutdownListener) -> Result<()> {
        info!("[LISTENER] receiving on {} transport", self.transport.name());
        let mut consecutive_errors = 0u32;

        loop {
            let received = tokio::select! {
                _ = shutdown.recv() => {
                    info!("[LISTENER] shutdown requested");
                    return Ok(());
                }
                received = self.transport.recv_from() => received,
            };

            let (payload, sender) = match received {
                Ok(datagram) => {
                    consecutive_errors = 0;
                    datagram
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "[LISTENER] receive error ({}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_RECV_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_RECV_ERRORS {
                        return Err(anyhow!("transport receive failing repeatedly: {}", e));
                    }
                    continue;
                }
            };

            DeviceStats::incr(&self.stats.datagrams_received);

            let command = match codec::decode(&payload) {
                Ok(command) => command,
                Err(e) => {
                    DeviceStats::incr(&self.stats.decode_failures);
                    debug!("[LISTENER] dropped datagram from {}: {}", sender, e);
                    continue;
                }
            };

            debug!("[LISTENER] {} from {}", command.name(), sender);

            match self.commands.try_send(InboundCommand { command, sender }) {
                Ok(()) => DeviceStats::incr(&self.stats.commands_forwarded),
                Err(TrySendError::Full(dropped)) => {
                    DeviceStats::incr(&self.stats.commands_dropped);
                    warn!(
                        "[LISTENER] controller backlog full, dropped {} from {}",
                        dropped.command.name(),
                        dropped.sender
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    info!("[LISTENER] controller gone, stopping");
                    return Ok(());
                }
            }
        }
    }
}
