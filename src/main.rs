mod ack;
mod action;
mod config;
mod controller;
mod error;
mod listener;
mod signal;
mod stats;
mod timer;
mod transport;

use action::{Action, LogAction, UdpTriggerAction};
use ack::AckSender;
use actuator_shared::state_machine::SessionState;
use anyhow::{Context, Result};
use clap::Parser;
use config::DeviceConfig;
use controller::Controller;
use listener::Listener;
use signal::ShutdownListener;
use stats::DeviceStats;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use transport::{DatagramTransport, UdpTransport};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Tasks making up a running device
struct Device {
    listener: JoinHandle<Result<()>>,
    controller: JoinHandle<()>,
    state_log: JoinHandle<SessionState>,
}

/// Wire listener and controller together over the command channel and start them
fn spawn_device(
    transport: Arc<dyn DatagramTransport>,
    action: Arc<dyn Action>,
    config: &DeviceConfig,
    stats: Arc<DeviceStats>,
    shutdown: ShutdownListener,
) -> Device {
    let (command_tx, command_rx) = mpsc::channel(config.channel_capacity.max(1));

    let acks = AckSender::new(
        transport.clone(),
        config.client_id.clone(),
        config.ack_port,
        stats.clone(),
    );
    let controller = Controller::new(
        command_rx,
        acks,
        action,
        stats.clone(),
        config.status_interval(),
    );
    let state_log = tokio::spawn(controller::log_state_changes(controller.subscribe()));
    let controller = tokio::spawn(controller.run());

    let listener = Listener::new(transport, command_tx, stats);
    let listener = tokio::spawn(listener.run(shutdown));

    Device {
        listener,
        controller,
        state_log,
    }
}

impl Device {
    /// Wait for the controller to wind down once the listener has exited
    async fn join(self) -> Option<SessionState> {
        // The listener is gone, so the command channel is closed and the
        // controller stops on its own
        if let Err(e) = self.controller.await {
            error!("Controller task failed: {}", e);
        }
        self.state_log.await.ok()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = DeviceConfig::parse();

    info!("Actuator device starting: {}", config.client_id);

    // Host networking is managed by the OS; report it up straight away
    let (network, mut readiness) = signal::readiness();
    network.set_ready();
    readiness
        .wait_ready(config.ready_timeout())
        .await
        .context("network never became ready")?;

    let udp = Arc::new(UdpTransport::bind(config.listen_addr).await?);
    info!("  Listening on {}", udp.local_addr()?);
    info!("  Acks go to <sender-ip>:{}", config.ack_port);
    let transport: Arc<dyn DatagramTransport> = udp;

    let stats = Arc::new(DeviceStats::default());

    let action: Arc<dyn Action> = match config.trigger_addr {
        Some(addr) => {
            info!("  Trigger datagrams go to {}", addr);
            Arc::new(UdpTriggerAction::new(transport.clone(), addr, &config.client_id)?)
        }
        None => Arc::new(LogAction::new(config.client_id.clone())),
    };

    let (shutdown, shutdown_rx) = signal::shutdown();
    let mut device = spawn_device(transport, action, &config, stats.clone(), shutdown_rx);

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            shutdown.trigger();
            (&mut device.listener).await.context("listener task failed")?
        }
        result = &mut device.listener => {
            result.context("listener task failed")?
        }
    };

    let final_state = device.join().await;

    info!("Final state: {:?}", final_state);
    info!("Final stats: {:?}", stats.snapshot());

    if let Err(e) = &outcome {
        warn!("Listener stopped with error: {:#}", e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Shutdown;
    use crate::transport::fake::{FakeNetwork, FakeTransport};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::time::sleep;

    /// A device running on an in-memory network with the log-only action
    struct Rig {
        transport: Arc<FakeTransport>,
        net: FakeNetwork,
        stats: Arc<DeviceStats>,
        shutdown: Shutdown,
        device: Device,
    }

    fn coordinator() -> SocketAddr {
        "10.0.0.5:50000".parse().unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    impl Rig {
        fn start() -> Self {
            let (transport, net) = FakeTransport::new();
            let stats = Arc::new(DeviceStats::default());
            let config = DeviceConfig::default();
            let (shutdown, shutdown_rx) = signal::shutdown();
            let device = spawn_device(
                transport.clone(),
                Arc::new(LogAction::new(config.client_id.clone())),
                &config,
                stats.clone(),
                shutdown_rx,
            );

            Self {
                transport,
                net,
                stats,
                shutdown,
                device,
            }
        }

        async fn deliver(&self, payload: &[u8]) {
            self.net.deliver(payload, coordinator());
            sleep(ms(1)).await;
        }

        fn fired(&self) -> u64 {
            self.stats.snapshot().actions_fired
        }

        async fn stop(mut self) -> Option<SessionState> {
            self.shutdown.trigger();
            (&mut self.device.listener)
                .await
                .expect("listener panicked")
                .expect("clean exit");
            self.device.join().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_datagram_cancels_countdown_and_restart_is_accepted() {
        let rig = Rig::start();

        rig.deliver(br#"{"cmd":"start","seq":1,"delay_ms":5000}"#).await;
        assert_eq!(
            rig.transport.sent_json(),
            vec![(
                "10.0.0.5:3333".parse().unwrap(),
                serde_json::json!({"id": "ESP32_ABC123", "status": "ack", "seq": 1})
            )]
        );

        sleep(ms(1000)).await;
        rig.deliver(br#"{"cmd":"stop"}"#).await;
        assert_eq!(rig.stats.snapshot().stops_applied, 1);

        sleep(ms(10_000)).await;
        assert_eq!(rig.fired(), 0);
        assert_eq!(rig.transport.sent().len(), 1);

        rig.deliver(br#"{"cmd":"start","seq":2,"delay_ms":100}"#).await;
        sleep(ms(200)).await;
        assert_eq!(rig.fired(), 1);

        let acked: Vec<_> = rig
            .transport
            .sent_json()
            .into_iter()
            .map(|(_, json)| json["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(acked, vec![1, 2]);

        assert_eq!(rig.stop().await, Some(SessionState::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_start_datagram_keeps_first_countdown() {
        let rig = Rig::start();

        rig.deliver(br#"{"cmd":"start","seq":1,"delay_ms":5000}"#).await;
        sleep(ms(50)).await;
        rig.deliver(br#"{"cmd":"start","seq":2,"delay_ms":100}"#).await;

        sleep(ms(1000)).await;
        assert_eq!(rig.fired(), 0);
        assert_eq!(rig.transport.sent().len(), 1);

        sleep(ms(4000)).await;
        assert_eq!(rig.fired(), 1);
        assert_eq!(rig.stats.snapshot().duplicate_starts, 1);
        assert_eq!(rig.transport.sent_json()[0].1["seq"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_seq_is_dropped_without_ack() {
        let rig = Rig::start();

        rig.deliver(br#"{"cmd":"start","delay_ms":100}"#).await;
        sleep(ms(500)).await;

        assert!(rig.transport.sent().is_empty());
        assert_eq!(rig.fired(), 0);
        let snap = rig.stats.snapshot();
        assert_eq!(snap.decode_failures, 1);
        assert_eq!(snap.starts_accepted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_countdown_ends_idle_without_firing() {
        let rig = Rig::start();

        rig.deliver(br#"{"cmd":"start","seq":3,"delay_ms":5000}"#).await;
        sleep(ms(1000)).await;

        let stats = rig.stats.clone();
        assert_eq!(rig.stop().await, Some(SessionState::Idle));
        assert_eq!(stats.snapshot().actions_fired, 0);
    }
}
