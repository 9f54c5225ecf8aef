//! Device configuration
//!
//! Every setting is a CLI flag that can also be supplied through an
//! `ACTUATOR_*` environment variable.

use actuator_shared::defaults;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Networked actuator: waits for `start`/`stop` datagrams and fires after a countdown.
#[derive(Parser, Debug, Clone)]
#[command(name = "actuator-device", version)]
pub struct DeviceConfig {
    /// Identifier reported in acks
    #[arg(long, env = "ACTUATOR_CLIENT_ID", default_value = defaults::CLIENT_ID)]
    pub client_id: String,

    /// Address to receive commands on
    #[arg(long, env = "ACTUATOR_LISTEN_ADDR", default_value = "0.0.0.0:12345")]
    pub listen_addr: SocketAddr,

    /// Port acks are sent to, on the command sender's IP
    #[arg(long, env = "ACTUATOR_ACK_PORT", default_value_t = defaults::ACK_PORT)]
    pub ack_port: u16,

    /// Commands buffered between listener and controller
    #[arg(long, env = "ACTUATOR_CHANNEL_CAPACITY", default_value_t = 32)]
    pub channel_capacity: usize,

    /// Interval of the controller's status tick, in milliseconds
    #[arg(long, env = "ACTUATOR_STATUS_INTERVAL_MS", default_value_t = 1000)]
    pub status_interval_ms: u64,

    /// How long to wait for the network before giving up, in milliseconds
    #[arg(long, env = "ACTUATOR_READY_TIMEOUT_MS", default_value_t = 30_000)]
    pub ready_timeout_ms: u64,

    /// Send a trigger datagram here when a countdown fires (default: log only)
    #[arg(long, env = "ACTUATOR_TRIGGER_ADDR")]
    pub trigger_addr: Option<SocketAddr>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            client_id: defaults::CLIENT_ID.into(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], defaults::LISTEN_PORT)),
            ack_port: defaults::ACK_PORT,
            channel_capacity: 32,
            status_interval_ms: 1000,
            ready_timeout_ms: 30_000,
            trigger_addr: None,
        }
    }
}

impl DeviceConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_default() {
        let parsed = DeviceConfig::try_parse_from(["actuator-device"]).expect("parse");
        let default = DeviceConfig::default();

        assert_eq!(parsed.client_id, default.client_id);
        assert_eq!(parsed.listen_addr, default.listen_addr);
        assert_eq!(parsed.listen_addr.port(), 12345);
        assert_eq!(parsed.ack_port, 3333);
        assert_eq!(parsed.trigger_addr, None);
    }

    #[test]
    fn test_cli_overrides() {
        let parsed = DeviceConfig::try_parse_from([
            "actuator-device",
            "--client-id",
            "ESP32_DEF456",
            "--listen-addr",
            "127.0.0.1:20000",
            "--ack-port",
            "4000",
            "--trigger-addr",
            "10.0.0.9:7777",
        ])
        .expect("parse");

        assert_eq!(parsed.client_id, "ESP32_DEF456");
        assert_eq!(parsed.listen_addr, "127.0.0.1:20000".parse().unwrap());
        assert_eq!(parsed.ack_port, 4000);
        assert_eq!(parsed.trigger_addr, Some("10.0.0.9:7777".parse().unwrap()));
    }

    #[test]
    fn test_zero_status_interval_is_clamped() {
        let config = DeviceConfig {
            status_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.status_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(DeviceConfig::try_parse_from(["actuator-device", "--ack-port", "70000"]).is_err());
    }
}
