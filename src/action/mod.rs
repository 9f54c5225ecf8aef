//! Actuator actions fired when a countdown reaches zero
//!
//! The controller invokes [`Action::fire`] at most once per accepted,
//! non-cancelled `start`. The call runs on its own task, so an actuator that
//! takes a while never holds up the next command.

mod logger;
mod trigger;

pub use logger::LogAction;
pub use trigger::UdpTriggerAction;

use crate::error::ActionError;
use async_trait::async_trait;

#[async_trait]
pub trait Action: Send + Sync + 'static {
    async fn fire(&self) -> Result<(), ActionError>;

    /// Human-readable name for this action
    fn name(&self) -> &'static str;
}
