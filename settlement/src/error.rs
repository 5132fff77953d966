//! Error types for settlement engine

use ledger_core::{ParticipantId, RoomId};
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Extraction from an empty priority structure
    #[error("Priority structure is empty")]
    EmptyStructure,

    /// Heap handle no longer refers to a live item
    #[error("Heap handle {0} is no longer present")]
    StaleHandle(usize),

    /// One side of the matching ran out before the other
    #[error("Netting invariant violated: {debtors} debtors and {creditors} creditors left unpaired")]
    NettingInvariantViolation {
        /// Debtors still holding a balance
        debtors: usize,
        /// Creditors still holding a balance
        creditors: usize,
    },

    /// Balance arithmetic left the i64 range
    #[error("Balance overflow for participant {0}")]
    BalanceOverflow(ParticipantId),

    /// Store failure while recomputing a room
    #[error("Settlement recompute failed for room {room_id}: {source}")]
    RecomputeFailed {
        /// Room being recomputed
        room_id: RoomId,
        /// Underlying store error
        #[source]
        source: ledger_core::Error,
    },

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
