//! Error types for the device's outbound paths

use actuator_shared::codec::EncodeError;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Failure to put an ack or trigger datagram on the wire
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Send to {target} failed: {source}")]
    Io {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Short send to {target}: {sent} of {len} bytes")]
    Truncated {
        target: SocketAddr,
        sent: usize,
        len: usize,
    },
}

/// Failure reported by the actuator when a countdown fires
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Actuator not ready: {0}")]
    NotReady(String),

    #[error("Trigger failed: {0}")]
    Trigger(#[from] SendError),

    #[error("Action task did not complete: {0}")]
    Aborted(String),
}

/// Failure while waiting for the network to come up
#[derive(Error, Debug)]
pub enum ReadinessError {
    #[error("Network not ready after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Network readiness signal dropped before ready")]
    Closed,
}
