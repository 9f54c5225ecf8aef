mod broadcast;
mod command;

use actuator_shared::{defaults, now_ms};
use anyhow::{bail, Context, Result};
use clap::Parser;
use command::{run_round, AckCollector, CommandDispatcher, RoundOutcome, RoundPlan};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Broadcast a countdown to actuator devices and abort if any fail to ack.
#[derive(Parser, Debug, Clone)]
#[command(name = "coordinator", version)]
struct CoordinatorConfig {
    /// Broadcast address (default: derived from the local IP)
    #[arg(long, env = "COORD_BROADCAST_ADDR")]
    broadcast_addr: Option<Ipv4Addr>,

    /// Device command port
    #[arg(long, env = "COORD_START_PORT", default_value_t = defaults::LISTEN_PORT)]
    start_port: u16,

    /// Port to collect acks on
    #[arg(long, env = "COORD_ACK_PORT", default_value_t = defaults::ACK_PORT)]
    ack_port: u16,

    /// Sequence slots as seq:delay_ms pairs
    #[arg(
        long,
        env = "COORD_SEQ_DELAYS",
        value_delimiter = ',',
        value_parser = parse_seq_delay,
        default_value = "0:10000,1:9950,2:9900"
    )]
    seq_delays: Vec<(i64, u64)>,

    /// Device ids that must ack
    #[arg(
        long,
        env = "COORD_EXPECTED",
        value_delimiter = ',',
        default_value = defaults::CLIENT_ID
    )]
    expected: Vec<String>,

    /// How long to wait for acks, in milliseconds
    #[arg(long, env = "COORD_ACK_WINDOW_MS", default_value_t = 1000)]
    ack_window_ms: u64,

    /// Pause between consecutive packets, in milliseconds
    #[arg(long, env = "COORD_SPACING_MS", default_value_t = 50)]
    spacing_ms: u64,

    /// Number of times the abort stop is sent
    #[arg(long, env = "COORD_STOP_TRIES", default_value_t = 3)]
    stop_tries: u32,

    /// Session id attached to every start (default: current unix time)
    #[arg(long, env = "COORD_SESSION")]
    session: Option<u64>,
}

fn parse_seq_delay(s: &str) -> Result<(i64, u64), String> {
    let (seq, delay) = s
        .split_once(':')
        .ok_or_else(|| format!("expected seq:delay_ms, got '{}'", s))?;
    let seq = seq
        .trim()
        .parse()
        .map_err(|e| format!("bad seq '{}': {}", seq, e))?;
    let delay = delay
        .trim()
        .parse()
        .map_err(|e| format!("bad delay_ms '{}': {}", delay, e))?;
    Ok((seq, delay))
}

impl CoordinatorConfig {
    fn plan(&self) -> RoundPlan {
        RoundPlan {
            session: self.session.unwrap_or_else(|| now_ms() / 1000),
            seq_delays: self.seq_delays.clone(),
            expected: self.expected.iter().cloned().collect(),
            ack_window: Duration::from_millis(self.ack_window_ms),
            stop_tries: self.stop_tries,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = CoordinatorConfig::parse();
    if config.seq_delays.is_empty() {
        bail!("at least one seq:delay_ms slot is required");
    }

    let broadcast_ip = config
        .broadcast_addr
        .unwrap_or_else(broadcast::discover_broadcast_ip);
    let target = SocketAddr::from((broadcast_ip, config.start_port));

    // Bind acks first; a fast device may answer before the last start is out
    let collector = AckCollector::bind(SocketAddr::from(([0, 0, 0, 0], config.ack_port)))
        .await
        .context("cannot listen for acks")?;
    let dispatcher = CommandDispatcher::bind(target, Duration::from_millis(config.spacing_ms))
        .await?;

    info!("Coordinator starting");
    info!("  Broadcast: {}", target);
    info!("  Acks on:   {}", collector.local_addr()?);

    match run_round(&dispatcher, &collector, &config.plan()).await? {
        RoundOutcome::Proceed { ack_interval, acked } => {
            info!(
                "PROCEED: {} device(s) acked within {} ms",
                acked.len(),
                ack_interval.as_millis()
            );
        }
        RoundOutcome::Aborted { missing } => {
            warn!("ABORTED: no ack from {:?}", missing);
        }
    }

    Ok(())
}
