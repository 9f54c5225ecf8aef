//! Command dispatch and ack tracking for the coordinator
//!
//! This module handles:
//! - Broadcasting start commands for every sequence slot
//! - Collecting acks within a fixed window
//! - Broadcasting stop when expected devices stay silent

mod collector;
mod dispatcher;
mod round;

pub use collector::AckCollector;
pub use dispatcher::CommandDispatcher;
pub use round::{run_round, RoundOutcome, RoundPlan};
