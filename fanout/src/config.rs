//! Subscriber configuration

use serde::{Deserialize, Serialize};

/// Per-subscriber delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Updates buffered per subscriber before it counts as saturated
    pub queue_capacity: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

impl SubscriberConfig {
    /// Override from `ROOM_SUBSCRIBER_BUFFER`
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(buffer) = std::env::var("ROOM_SUBSCRIBER_BUFFER") {
            self.queue_capacity = buffer.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid ROOM_SUBSCRIBER_BUFFER: {}", buffer))
            })?;
        }
        self.validate()
    }

    /// Reject settings the registry cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.queue_capacity == 0 {
            return Err(crate::Error::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
