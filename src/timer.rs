//! Cancellable countdown timer
//!
//! Holds at most one armed deadline. The owner awaits [`CountdownTimer::expired`]
//! inside the same `select!` that receives commands, so a cancel and an expiry
//! can never both be observed for one countdown. While nothing is armed,
//! `expired` never resolves.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Handle for one arming of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownId(u64);

struct Armed {
    id: CountdownId,
    sleep: Pin<Box<Sleep>>,
}

pub struct CountdownTimer {
    next_id: u64,
    armed: Option<Armed>,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            armed: None,
        }
    }

    /// Arm the timer to expire after `delay`, replacing any armed deadline
    pub fn arm(&mut self, delay: Duration) -> CountdownId {
        self.next_id += 1;
        let id = CountdownId(self.next_id);
        self.armed = Some(Armed {
            id,
            sleep: Box::pin(sleep(delay)),
        });
        id
    }

    /// Cancel the countdown identified by `id`. Returns false if it is no
    /// longer armed.
    pub fn cancel(&mut self, id: CountdownId) -> bool {
        match &self.armed {
            Some(armed) if armed.id == id => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    /// Drop whatever is armed
    pub fn disarm(&mut self) -> Option<CountdownId> {
        self.armed.take().map(|armed| armed.id)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|armed| armed.sleep.deadline())
    }

    /// Time left before the armed countdown expires
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Resolve once the armed countdown expires, disarming it. Cancel safe.
    pub async fn expired(&mut self) -> CountdownId {
        match self.armed.as_mut() {
            Some(armed) => {
                armed.sleep.as_mut().await;
                let id = armed.id;
                self.armed = None;
                id
            }
            None => futures::future::pending().await,
        }
    }
}
