//! Session controller
//!
//! The only owner of [`SessionState`]. A single task selects over:
//! - the next command from the listener
//! - expiry of the countdown timer
//! - completion of an in-flight action
//! - the periodic status tick
//!
//! Because every event is handled to completion before the next is taken,
//! "stop arrived" and "timer fired" are strictly ordered and never both apply
//! to the same countdown. Observers get a read-only copy of the state through
//! [`Controller::subscribe`].

use crate::ack::AckSender;
use crate::action::Action;
use crate::error::ActionError;
use crate::listener::InboundCommand;
use crate::stats::DeviceStats;
use crate::timer::{CountdownId, CountdownTimer};
use actuator_shared::state_machine::{SessionEvent, SessionMachine, SessionState, Transition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

type ActionOutcome = (i64, Result<(), ActionError>);

pub struct Controller {
    machine: SessionMachine,
    timer: CountdownTimer,
    countdown: Option<CountdownId>,
    commands: mpsc::Receiver<InboundCommand>,
    acks: AckSender,
    action: Arc<dyn Action>,
    in_flight: JoinSet<ActionOutcome>,
    stats: Arc<DeviceStats>,
    state_tx: watch::Sender<SessionState>,
    status_interval: Duration,
}

impl Controller {
    pub fn new(
        commands: mpsc::Receiver<InboundCommand>,
        acks: AckSender,
        action: Arc<dyn Action>,
        stats: Arc<DeviceStats>,
        status_interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            machine: SessionMachine::new(),
            timer: CountdownTimer::new(),
            countdown: None,
            commands,
            acks,
            action,
            in_flight: JoinSet::new(),
            stats,
            state_tx,
            status_interval,
        }
    }

    /// Read-only view of the session state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Run until the command channel closes
    pub async fn run(mut self) {
        info!(
            "[CONTROLLER] started, action={} status every {:?}",
            self.action.name(),
            self.status_interval
        );

        let mut ticker = interval(self.status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                inbound = self.commands.recv() => match inbound {
                    Some(inbound) => self.handle_command(inbound).await,
                    None => {
                        info!("[CONTROLLER] command channel closed");
                        break;
                    }
                },

                id = self.timer.expired() => self.handle_expiry(id),

                Some(joined) = self.in_flight.join_next() => self.handle_action_result(joined),

                _ = ticker.tick() => self.handle_tick(),
            }
        }

        self.shutdown().await;
    }

    async fn handle_command(&mut self, inbound: InboundCommand) {
        let event = SessionEvent::Command {
            command: inbound.command,
            sender: inbound.sender,
        };

        match self.machine.process_event(event) {
            Transition::Armed {
                seq,
                delay_ms,
                target,
            } => {
                self.countdown = Some(self.timer.arm(Duration::from_millis(delay_ms)));
                DeviceStats::incr(&self.stats.starts_accepted);
                info!(
                    "[CONTROLLER] start seq={} accepted from {}, firing in {}ms",
                    seq, target, delay_ms
                );
                self.publish();

                if let Err(e) = self.acks.send_ack(target, seq).await {
                    warn!("[CONTROLLER] ack for seq={} not delivered: {}", seq, e);
                }
            }
            Transition::DuplicateStart {
                active_seq,
                ignored_seq,
            } => {
                DeviceStats::incr(&self.stats.duplicate_starts);
                info!(
                    "[CONTROLLER] duplicate start seq={} ignored, seq={} still counting down",
                    ignored_seq, active_seq
                );
            }
            Transition::Cancelled { seq } => {
                if let Some(id) = self.countdown.take() {
                    self.timer.cancel(id);
                }
                DeviceStats::incr(&self.stats.stops_applied);
                info!("[CONTROLLER] stop: countdown seq={} cancelled", seq);
                self.publish();
            }
            Transition::StopIgnored => {
                DeviceStats::incr(&self.stats.stops_ignored);
                debug!("[CONTROLLER] stop while idle, nothing to cancel");
            }
            other => warn!("[CONTROLLER] unexpected transition for command: {:?}", other),
        }
    }

    fn handle_expiry(&mut self, id: CountdownId) {
        if self.countdown != Some(id) {
            warn!("[CONTROLLER] stale countdown {:?} expired, ignoring", id);
            return;
        }
        self.countdown = None;

        match self.machine.process_event(SessionEvent::CountdownExpired) {
            Transition::Fire { seq } => {
                DeviceStats::incr(&self.stats.actions_fired);
                info!("[CONTROLLER] countdown seq={} reached zero, firing", seq);

                let action = self.action.clone();
                self.in_flight.spawn(async move { (seq, action.fire().await) });
                self.publish();
            }
            other => warn!("[CONTROLLER] expiry without countdown: {:?}", other),
        }
    }

    fn handle_action_result(&mut self, joined: Result<ActionOutcome, JoinError>) {
        match joined {
            Ok((seq, Ok(()))) => debug!("[CONTROLLER] action for seq={} completed", seq),
            Ok((seq, Err(e))) => {
                DeviceStats::incr(&self.stats.action_failures);
                error!("[CONTROLLER] action for seq={} failed: {}", seq, e);
            }
            Err(e) => {
                DeviceStats::incr(&self.stats.action_failures);
                error!("[CONTROLLER] {}", ActionError::Aborted(e.to_string()));
            }
        }
    }

    fn handle_tick(&mut self) {
        if let Some(remaining) = self.timer.remaining() {
            self.machine.update_remaining(remaining.as_millis() as u64);
            if let SessionState::CountingDown {
                seq, remaining_ms, ..
            } = self.machine.state()
            {
                debug!("[CONTROLLER] seq={} fires in {}ms", seq, remaining_ms);
            }
            self.publish();
        }
    }

    async fn shutdown(&mut self) {
        if let Some(id) = self.timer.disarm() {
            debug!("[CONTROLLER] disarmed countdown {:?}", id);
        }
        self.countdown = None;

        if let Transition::Abandoned { seq: Some(seq) } =
            self.machine.process_event(SessionEvent::Shutdown)
        {
            warn!("[CONTROLLER] shutdown abandoned countdown seq={}", seq);
        }
        self.publish();

        while let Some(joined) = self.in_flight.join_next().await {
            self.handle_action_result(joined);
        }
        info!("[CONTROLLER] stopped");
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.machine.state());
    }
}

/// Log session transitions published by a controller until it stops.
///
/// Status-tick updates of `remaining_ms` are not logged. Returns the last
/// state the controller published.
pub async fn log_state_changes(mut state: watch::Receiver<SessionState>) -> SessionState {
    let mut last = *state.borrow_and_update();
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        if current.is_idle() != last.is_idle() || current.active_seq() != last.active_seq() {
            info!("[STATE] {:?} -> {:?}", last, current);
        }
        last = current;
    }
    last
}
