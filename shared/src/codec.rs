//! JSON codec for single-datagram messages
//!
//! Every message is one JSON object per datagram, with no framing:
//! ```text
//! {"cmd":"start","seq":1,"delay_ms":5000}
//! {"cmd":"stop"}
//! {"id":"ESP32_ABC123","status":"ack","seq":1}
//! ```
//!
//! Inbound commands are decoded by hand from a `serde_json::Value` so each
//! failure lands in a specific [`DecodeError`] variant. Fields the device does
//! not use (`session`, `reason`) are ignored.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Ack, Command, CommandMessage, TriggerEvent};

/// Errors that can occur while decoding a datagram
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Unknown command: {}", .0.as_deref().unwrap_or("<missing cmd>"))]
    UnknownCommand(Option<String>),

    #[error("Missing or non-integer field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
}

/// Errors that can occur while encoding an outbound message
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one inbound datagram into a [`Command`]
pub fn decode(buf: &[u8]) -> Result<Command, DecodeError> {
    let value: Value =
        serde_json::from_slice(buf).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("expected a JSON object".into()))?;

    match object.get("cmd").and_then(Value::as_str) {
        Some("start") => decode_start(object),
        Some("stop") => Ok(Command::Stop),
        Some(other) => Err(DecodeError::UnknownCommand(Some(other.to_string()))),
        None => Err(DecodeError::UnknownCommand(None)),
    }
}

fn decode_start(object: &Map<String, Value>) -> Result<Command, DecodeError> {
    let seq = integer_field(object, "seq")?;
    let delay_ms = integer_field(object, "delay_ms")?;

    if delay_ms < 0 {
        return Err(DecodeError::InvalidValue {
            field: "delay_ms",
            value: delay_ms,
        });
    }

    Ok(Command::Start {
        seq,
        delay_ms: delay_ms as u64,
    })
}

fn integer_field(object: &Map<String, Value>, field: &'static str) -> Result<i64, DecodeError> {
    object
        .get(field)
        .and_then(Value::as_i64)
        .ok_or(DecodeError::MissingField(field))
}

/// Decode an ack datagram (coordinator side)
pub fn decode_ack(buf: &[u8]) -> Result<Ack, DecodeError> {
    serde_json::from_slice(buf).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn encode_json<T: Serialize>(message: &T) -> Result<Bytes, EncodeError> {
    Ok(Bytes::from(serde_json::to_vec(message)?))
}

/// Encode an ack into a datagram payload
pub fn encode_ack(ack: &Ack) -> Result<Bytes, EncodeError> {
    encode_json(ack)
}

/// Encode an outbound command into a datagram payload
pub fn encode_command(message: &CommandMessage) -> Result<Bytes, EncodeError> {
    encode_json(message)
}

/// Encode an actuator trigger into a datagram payload
pub fn encode_trigger(event: &TriggerEvent) -> Result<Bytes, EncodeError> {
    encode_json(event)
}
