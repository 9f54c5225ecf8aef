//! Actuator Shared Protocol Types
//!
//! This crate provides the wire types, JSON codec and session state machine
//! shared by the actuator device and the coordinator that drives it.

pub mod codec;
pub mod state_machine;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Transport-level origin of an inbound datagram (IP + port)
pub type SenderAddress = SocketAddr;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Protocol defaults shared by both ends of the link
pub mod defaults {
    /// Port the device listens on for `start`/`stop` commands
    pub const LISTEN_PORT: u16 = 12345;

    /// Port acks are sent to, on the IP of the `start` sender
    pub const ACK_PORT: u16 = 3333;

    /// Identifier the device reports in its acks
    pub const CLIENT_ID: &str = "ESP32_ABC123";

    /// Largest datagram either side will read
    pub const MAX_DATAGRAM_SIZE: usize = 1024;
}

/// A command decoded from one inbound datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Arm a countdown that fires the action after `delay_ms`
    Start { seq: i64, delay_ms: u64 },
    /// Cancel the running countdown, if any
    Stop,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::Stop => "stop",
        }
    }
}

/// Outbound form of a command, as the coordinator puts it on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum CommandMessage {
    Start {
        seq: i64,
        delay_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<u64>,
    },
    Stop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// Status literal carried by an ack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ack,
}

/// Acknowledgement of an accepted command: `{"id":..,"status":"ack","seq":..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub id: String,
    pub status: AckStatus,
    pub seq: i64,
}

impl Ack {
    /// Create an ACK for an accepted command
    pub fn accepted(id: impl Into<String>, seq: i64) -> Self {
        Self {
            id: id.into(),
            status: AckStatus::Ack,
            seq,
        }
    }
}

/// Event literal carried by a trigger datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Fire,
}

/// Datagram sent to an external actuator when a countdown fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: String,
    pub event: TriggerKind,
}

impl TriggerEvent {
    pub fn fire(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event: TriggerKind::Fire,
        }
    }
}
