//! Error types for the room service

use crate::service::CommittedChange;
use thiserror::Error;

/// Result type for room service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Room service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger operation failed; nothing was committed
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Mutation committed but the settlement snapshot could not be refreshed
    #[error("Settlement stale for room {}: {source}", .change.room_id)]
    SettlementStale {
        /// What was committed before the recompute failed
        change: Box<CommittedChange>,
        /// Recompute failure
        #[source]
        source: settlement::Error,
    },

    /// Settlement engine setup error
    #[error("Settlement error: {0}")]
    Settlement(#[from] settlement::Error),

    /// Fan-out setup error
    #[error("Fan-out error: {0}")]
    Fanout(#[from] fanout::Error),

    /// Request rejected before touching the ledger
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
