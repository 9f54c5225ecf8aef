//! In-memory transport used in tests to script inbound datagrams and capture
//! everything the device sends.

use crate::error::SendError;
use crate::transport::traits::DatagramTransport;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

type Datagram = (Bytes, SocketAddr);

pub struct FakeTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
    sent: Mutex<Vec<Datagram>>,
    send_error: Mutex<Option<io::ErrorKind>>,
}

/// Test-side handle that injects datagrams as if they came off the network
#[derive(Clone)]
pub struct FakeNetwork {
    tx: mpsc::UnboundedSender<Datagram>,
}

impl FakeNetwork {
    pub fn deliver(&self, payload: &[u8], from: SocketAddr) {
        let _ = self.tx.send((Bytes::copy_from_slice(payload), from));
    }
}

impl FakeTransport {
    pub fn new() -> (Arc<Self>, FakeNetwork) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
        });
        (transport, FakeNetwork { tx })
    }

    pub fn sent(&self) -> Vec<Datagram> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent datagrams decoded as JSON, for asserting on wire contents
    pub fn sent_json(&self) -> Vec<(SocketAddr, serde_json::Value)> {
        self.sent()
            .into_iter()
            .map(|(payload, to)| (to, serde_json::from_slice(&payload).unwrap()))
            .collect()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        *self.send_error.lock().unwrap() = fail.then_some(io::ErrorKind::Other);
    }

    /// Make every send fail with `kind`
    pub fn fail_sends_with(&self, kind: io::ErrorKind) {
        *self.send_error.lock().unwrap() = Some(kind);
    }
}

#[async_trait]
impl DatagramTransport for FakeTransport {
    async fn recv_from(&self) -> io::Result<Datagram> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(datagram) => Ok(datagram),
            // A quiet network: nothing more will ever arrive
            None => futures::future::pending().await,
        }
    }

    async fn send_to(&self, target: SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        if let Some(kind) = *self.send_error.lock().unwrap() {
            return Err(SendError::Io {
                target,
                source: io::Error::new(kind, "send failed"),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((Bytes::copy_from_slice(payload), target));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Fake"
    }
}
