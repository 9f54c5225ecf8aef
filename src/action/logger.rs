//! Action for hosts without attached hardware

use super::Action;
use crate::error::ActionError;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LogAction {
    client_id: String,
}

impl LogAction {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl Action for LogAction {
    async fn fire(&self) -> Result<(), ActionError> {
        info!("[ACTION] {} FIRE", self.client_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_action_always_succeeds() {
        let action = LogAction::new("ESP32_ABC123");
        assert!(action.fire().await.is_ok());
        assert!(action.fire().await.is_ok());
        assert_eq!(action.name(), "log");
    }
}
