//! Action that hands the firing off to an external actuator over UDP

use super::Action;
use crate::error::{ActionError, SendError};
use crate::transport::DatagramTransport;
use actuator_shared::codec;
use actuator_shared::TriggerEvent;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub struct UdpTriggerAction {
    transport: Arc<dyn DatagramTransport>,
    target: SocketAddr,
    payload: Bytes,
}

impl UdpTriggerAction {
    /// Build a trigger that sends `{"id":<client_id>,"event":"fire"}` to `target`
    pub fn new(
        transport: Arc<dyn DatagramTransport>,
        target: SocketAddr,
        client_id: &str,
    ) -> Result<Self> {
        let payload = codec::encode_trigger(&TriggerEvent::fire(client_id))?;
        Ok(Self {
            transport,
            target,
            payload,
        })
    }
}

#[async_trait]
impl Action for UdpTriggerAction {
    async fn fire(&self) -> Result<(), ActionError> {
        match self.transport.send_to(self.target, &self.payload).await {
            Ok(()) => {
                info!("[ACTION] trigger sent to {}", self.target);
                Ok(())
            }
            Err(SendError::Io { source, .. }) if is_unreachable(&source) => {
                Err(ActionError::NotReady(format!(
                    "actuator at {} unreachable: {}",
                    self.target, source
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "udp-trigger"
    }
}

fn is_unreachable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
    )
}
