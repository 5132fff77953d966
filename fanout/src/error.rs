//! Error types for room fan-out

use crate::subscriber::SubscriptionId;
use thiserror::Error;

/// Why a payload could not be queued for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// Subscriber queue is full
    Saturated,
    /// Subscriber stopped receiving
    Disconnected,
}

impl DeliveryFailure {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryFailure::Saturated => "saturated",
            DeliveryFailure::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fan-out error
#[derive(Debug, Error)]
pub enum Error {
    /// Broadcast could not reach one subscriber
    #[error("Delivery to subscription {subscription_id} failed: {reason}")]
    DeliveryFailed {
        /// Affected subscription
        subscription_id: SubscriptionId,
        /// Failure kind
        reason: DeliveryFailure,
    },

    /// Transport sink refused a payload
    #[error("Sink closed: {0}")]
    SinkClosed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
