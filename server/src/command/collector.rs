//! Ack collection with a fixed listening window

use actuator_shared::{codec, defaults::MAX_DATAGRAM_SIZE};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

/// What arrived during one collection window
#[derive(Debug, Default, Clone)]
pub struct AckReport {
    /// Acked sequence numbers per expected device id
    pub received: BTreeMap<String, Vec<i64>>,
    /// Arrival of the last ack from an expected device
    pub last_ack_at: Option<Instant>,
    /// Acks from devices nobody was waiting for
    pub unexpected: usize,
}

impl AckReport {
    /// Expected device ids that never acked
    pub fn missing(&self, expected: &BTreeSet<String>) -> BTreeSet<String> {
        expected
            .iter()
            .filter(|id| !self.received.contains_key(*id))
            .cloned()
            .collect()
    }
}

/// Listens on the ack port
pub struct AckCollector {
    socket: UdpSocket,
}

impl AckCollector {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind ack port {}", addr))?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Gather acks until `window` has elapsed
    pub async fn collect(&self, expected: &BTreeSet<String>, window: Duration) -> AckReport {
        let deadline = Instant::now() + window;
        let mut report = AckReport::default();
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (n, from) = match timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Err(_) => break,
                Ok(Err(e)) => {
                    error!("[COORD] ack receive error: {}", e);
                    continue;
                }
                Ok(Ok(received)) => received,
            };

            let ack = match codec::decode_ack(&buf[..n]) {
                Ok(ack) => ack,
                Err(e) => {
                    error!("[COORD] bad ack from {}: {}", from, e);
                    continue;
                }
            };

            info!("[COORD] <- ACK {}: {:?}", from, ack);

            if expected.contains(&ack.id) {
                report.received.entry(ack.id).or_default().push(ack.seq);
                report.last_ack_at = Some(Instant::now());
            } else {
                warn!("[COORD] ack from unexpected device {}", ack.id);
                report.unexpected += 1;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_collects_expected_acks_and_reports_missing() {
        let collector = AckCollector::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let ack_addr = collector.local_addr().unwrap();
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        for payload in [
            &br#"{"id":"ESP32_A","status":"ack","seq":0}"#[..],
            br#"{"id":"ESP32_A","status":"ack","seq":1}"#,
            br#"{"id":"ESP32_Z","status":"ack","seq":0}"#,
            b"garbage",
        ] {
            device.send_to(payload, ack_addr).await.unwrap();
        }

        let expected = ids(&["ESP32_A", "ESP32_B"]);
        let report = collector
            .collect(&expected, Duration::from_millis(300))
            .await;

        assert_eq!(report.received.get("ESP32_A"), Some(&vec![0, 1]));
        assert_eq!(report.unexpected, 1);
        assert!(report.last_ack_at.is_some());
        assert_eq!(report.missing(&expected), ids(&["ESP32_B"]));
    }

    #[tokio::test]
    async fn test_silent_window_reports_everyone_missing() {
        let collector = AckCollector::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let expected = ids(&["ESP32_ABC123"]);

        let report = collector.collect(&expected, Duration::from_millis(50)).await;

        assert!(report.received.is_empty());
        assert!(report.last_ack_at.is_none());
        assert_eq!(report.missing(&expected), expected);
    }
}
