//! Session State Machine
//!
//! Decides what a command or a countdown expiry means for the session. The
//! machine is pure: it never touches a timer, a socket or the actuator, it only
//! reports which effect the owner has to carry out.

use crate::{Command, SenderAddress};

/// The single piece of mutable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    CountingDown {
        seq: i64,
        remaining_ms: u64,
        target: SenderAddress,
    },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Sequence number of the running countdown
    pub fn active_seq(&self) -> Option<i64> {
        match self {
            SessionState::Idle => None,
            SessionState::CountingDown { seq, .. } => Some(*seq),
        }
    }
}

/// Events that can drive a transition
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A decoded command arrived from `sender`
    Command {
        command: Command,
        sender: SenderAddress,
    },
    /// The countdown timer reached zero
    CountdownExpired,
    /// The owner is shutting down
    Shutdown,
}

/// Effect the owner must apply after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Start accepted: arm the countdown and ack `seq` to `target`
    Armed {
        seq: i64,
        delay_ms: u64,
        target: SenderAddress,
    },
    /// Start received while a countdown is running; nothing changes
    DuplicateStart { active_seq: i64, ignored_seq: i64 },
    /// Stop received while counting down: cancel the countdown
    Cancelled { seq: i64 },
    /// Stop received while idle; nothing changes
    StopIgnored,
    /// Countdown reached zero: fire the action
    Fire { seq: i64 },
    /// Expiry with no countdown running
    SpuriousExpiry,
    /// Shutdown abandoned the countdown for `seq`, if there was one
    Abandoned { seq: Option<i64> },
}

/// The session state machine for the actuator
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
}

impl SessionMachine {
    /// Create a new state machine in Idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Refresh the time left on the running countdown
    pub fn update_remaining(&mut self, remaining: u64) {
        if let SessionState::CountingDown { remaining_ms, .. } = &mut self.state {
            *remaining_ms = remaining;
        }
    }

    /// Process an event and return the effect to apply
    pub fn process_event(&mut self, event: SessionEvent) -> Transition {
        use SessionState::*;

        match (self.state, event) {
            (
                Idle,
                SessionEvent::Command {
                    command: Command::Start { seq, delay_ms },
                    sender,
                },
            ) => {
                self.state = CountingDown {
                    seq,
                    remaining_ms: delay_ms,
                    target: sender,
                };
                Transition::Armed {
                    seq,
                    delay_ms,
                    target: sender,
                }
            }

            (
                CountingDown { seq: active_seq, .. },
                SessionEvent::Command {
                    command: Command::Start { seq, .. },
                    ..
                },
            ) => Transition::DuplicateStart {
                active_seq,
                ignored_seq: seq,
            },

            (CountingDown { seq, .. }, SessionEvent::Command { command: Command::Stop, .. }) => {
                self.state = Idle;
                Transition::Cancelled { seq }
            }

            (Idle, SessionEvent::Command { command: Command::Stop, .. }) => {
                Transition::StopIgnored
            }

            (CountingDown { seq, .. }, SessionEvent::CountdownExpired) => {
                self.state = Idle;
                Transition::Fire { seq }
            }

            (Idle, SessionEvent::CountdownExpired) => Transition::SpuriousExpiry,

            (state, SessionEvent::Shutdown) => {
                self.state = Idle;
                Transition::Abandoned {
                    seq: state.active_seq(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SenderAddress {
        "192.168.1.20:50000".parse().unwrap()
    }

    fn start(seq: i64, delay_ms: u64) -> SessionEvent {
        SessionEvent::Command {
            command: Command::Start { seq, delay_ms },
            sender: sender(),
        }
    }

    fn stop() -> SessionEvent {
        SessionEvent::Command {
            command: Command::Stop,
            sender: sender(),
        }
    }

    #[test]
    fn test_initial_state() {
        let fsm = SessionMachine::new();
        assert_eq!(fsm.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_fire_cycle() {
        let mut fsm = SessionMachine::new();

        let result = fsm.process_event(start(1, 5000));
        assert_eq!(
            result,
            Transition::Armed {
                seq: 1,
                delay_ms: 5000,
                target: sender()
            }
        );
        assert_eq!(
            fsm.state(),
            SessionState::CountingDown {
                seq: 1,
                remaining_ms: 5000,
                target: sender()
            }
        );

        let result = fsm.process_event(SessionEvent::CountdownExpired);
        assert_eq!(result, Transition::Fire { seq: 1 });
        assert!(fsm.state().is_idle());
    }

    #[test]
    fn test_duplicate_start_leaves_countdown_untouched() {
        let mut fsm = SessionMachine::new();
        fsm.process_event(start(1, 5000));
        let before = fsm.state();

        let result = fsm.process_event(start(2, 100));
        assert_eq!(
            result,
            Transition::DuplicateStart {
                active_seq: 1,
                ignored_seq: 2
            }
        );
        assert_eq!(fsm.state(), before);
    }

    #[test]
    fn test_stop_cancels_countdown() {
        let mut fsm = SessionMachine::new();
        fsm.process_event(start(1, 5000));

        assert_eq!(fsm.process_event(stop()), Transition::Cancelled { seq: 1 });
        assert!(fsm.state().is_idle());

        // A cancelled countdown cannot fire
        assert_eq!(
            fsm.process_event(SessionEvent::CountdownExpired),
            Transition::SpuriousExpiry
        );
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut fsm = SessionMachine::new();
        for _ in 0..5 {
            assert_eq!(fsm.process_event(stop()), Transition::StopIgnored);
            assert!(fsm.state().is_idle());
        }
    }

    #[test]
    fn test_restart_after_cancel() {
        let mut fsm = SessionMachine::new();
        fsm.process_event(start(1, 5000));
        fsm.process_event(stop());

        let result = fsm.process_event(start(2, 250));
        assert!(matches!(result, Transition::Armed { seq: 2, delay_ms: 250, .. }));
    }

    #[test]
    fn test_update_remaining_only_while_counting_down() {
        let mut fsm = SessionMachine::new();
        fsm.update_remaining(10);
        assert!(fsm.state().is_idle());

        fsm.process_event(start(4, 3000));
        fsm.update_remaining(1200);
        assert!(matches!(
            fsm.state(),
            SessionState::CountingDown { seq: 4, remaining_ms: 1200, .. }
        ));
    }

    #[test]
    fn test_shutdown_abandons_countdown() {
        let mut fsm = SessionMachine::new();
        assert_eq!(
            fsm.process_event(SessionEvent::Shutdown),
            Transition::Abandoned { seq: None }
        );

        fsm.process_event(start(9, 1000));
        assert_eq!(
            fsm.process_event(SessionEvent::Shutdown),
            Transition::Abandoned { seq: Some(9) }
        );
        assert!(fsm.state().is_idle());
    }
}
