//! Counters for everything the device drops, ignores or fails at
//!
//! Decode failures, duplicate starts and failed sends are never reported to
//! the peer, so these counters are the only place they show up besides logs.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DeviceStats {
    pub datagrams_received: AtomicU64,
    pub decode_failures: AtomicU64,
    pub commands_forwarded: AtomicU64,
    pub commands_dropped: AtomicU64,
    pub starts_accepted: AtomicU64,
    pub duplicate_starts: AtomicU64,
    pub stops_applied: AtomicU64,
    pub stops_ignored: AtomicU64,
    pub acks_sent: AtomicU64,
    pub ack_failures: AtomicU64,
    pub actions_fired: AtomicU64,
    pub action_failures: AtomicU64,
}

/// Point-in-time copy of [`DeviceStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub datagrams_received: u64,
    pub decode_failures: u64,
    pub commands_forwarded: u64,
    pub commands_dropped: u64,
    pub starts_accepted: u64,
    pub duplicate_starts: u64,
    pub stops_applied: u64,
    pub stops_ignored: u64,
    pub acks_sent: u64,
    pub ack_failures: u64,
    pub actions_fired: u64,
    pub action_failures: u64,
}

impl DeviceStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            datagrams_received: get(&self.datagrams_received),
            decode_failures: get(&self.decode_failures),
            commands_forwarded: get(&self.commands_forwarded),
            commands_dropped: get(&self.commands_dropped),
            starts_accepted: get(&self.starts_accepted),
            duplicate_starts: get(&self.duplicate_starts),
            stops_applied: get(&self.stops_applied),
            stops_ignored: get(&self.stops_ignored),
            acks_sent: get(&self.acks_sent),
            ack_failures: get(&self.ack_failures),
            actions_fired: get(&self.actions_fired),
            action_failures: get(&self.action_failures),
        }
    }
}
