//! One-shot process signals: network readiness and shutdown
//!
//! Both are `watch` channels carrying a bool; observers only ever wait for it
//! to become `true`.

use crate::error::ReadinessError;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

/// Producer side of the network-readiness signal (the bring-up collaborator)
pub struct ReadinessHandle {
    tx: watch::Sender<bool>,
}

/// Consumer side, awaited once before the listener starts
pub struct NetworkReadiness {
    rx: watch::Receiver<bool>,
}

pub fn readiness() -> (ReadinessHandle, NetworkReadiness) {
    let (tx, rx) = watch::channel(false);
    (ReadinessHandle { tx }, NetworkReadiness { rx })
}

impl ReadinessHandle {
    pub fn set_ready(&self) {
        self.tx.send_replace(true);
    }
}

impl NetworkReadiness {
    /// Wait until the network has been reported up
    pub async fn wait_ready(&mut self, limit: Duration) -> Result<(), ReadinessError> {
        match timeout(limit, self.rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(ReadinessError::Closed),
            Err(_) => Err(ReadinessError::Timeout(limit)),
        }
    }
}

/// Trigger side of the shutdown signal
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Observer side; clone one per task
#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

pub fn shutdown() -> (Shutdown, ShutdownListener) {
    let (tx, rx) = watch::channel(false);
    (Shutdown { tx }, ShutdownListener { rx })
}

impl Shutdown {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl ShutdownListener {
    /// Resolve once shutdown is triggered (or the trigger side is gone)
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
