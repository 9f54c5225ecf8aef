//! One coordination round: start, collect acks, then proceed or abort

use super::{AckCollector, CommandDispatcher};
use anyhow::Result;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

/// Reason carried by the abort `stop`
pub const MISSING_ACKS: &str = "missing_acks";

/// Parameters for a single round
#[derive(Debug, Clone)]
pub struct RoundPlan {
    pub session: u64,
    pub seq_delays: Vec<(i64, u64)>,
    pub expected: BTreeSet<String>,
    pub ack_window: Duration,
    pub stop_tries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Every expected device acked; `ack_interval` runs from the first start
    /// to the last expected ack
    Proceed {
        ack_interval: Duration,
        acked: BTreeSet<String>,
    },
    /// Some devices stayed silent and a stop was broadcast
    Aborted { missing: BTreeSet<String> },
}

/// Drive one round.
///
/// The collector must already be bound so that acks racing the last start
/// packet are not lost.
pub async fn run_round(
    dispatcher: &CommandDispatcher,
    collector: &AckCollector,
    plan: &RoundPlan,
) -> Result<RoundOutcome> {
    info!(
        "[COORD] round session={} -> {} ({} slots)",
        plan.session,
        dispatcher.target(),
        plan.seq_delays.len()
    );

    let (started, report) = tokio::join!(
        dispatcher.broadcast_start(plan.session, &plan.seq_delays),
        collector.collect(&plan.expected, plan.ack_window),
    );
    let started = started?;

    let missing = report.missing(&plan.expected);
    if !missing.is_empty() {
        warn!("[COORD] missing acks from {:?}, aborting", missing);
        dispatcher.broadcast_stop(MISSING_ACKS, plan.stop_tries).await?;
        return Ok(RoundOutcome::Aborted { missing });
    }

    let ack_interval = report
        .last_ack_at
        .map(|at| at.saturating_duration_since(started))
        .unwrap_or_default();
    info!(
        "[COORD] all acks received in {} ms, PROCEED",
        ack_interval.as_millis()
    );

    Ok(RoundOutcome::Proceed {
        ack_interval,
        acked: report.received.into_keys().collect(),
    })
}
