//! Settlement Engine
//!
//! Reduces a room's web of pairwise debts into a short list of settle-up
//! transfers.
//!
//! # Architecture
//!
//! Every ledger mutation triggers a recompute of the room:
//!
//! 1. **Netting**: collapse all entries into one signed position per participant
//! 2. **Settlement**: greedily match the largest debtor with the largest creditor
//! 3. **Replace**: atomically swap the room's stored snapshot
//!
//! Recomputes are serialized per room by [`SettlementOrchestrator`].
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{MemoryStore, Room, LedgerStore};
//! use settlement::SettlementOrchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let room = store.create_room(Room::new("flat")).await?;
//!     let orchestrator = SettlementOrchestrator::new(store)?;
//!
//!     let snapshot = orchestrator.recompute(room.room_id).await?;
//!     println!("{} transfers settle the room", snapshot.len());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod greedy;
pub mod heap;
pub mod metrics;
pub mod netting;
pub mod orchestrator;

// Re-exports
pub use error::{Error, Result};
pub use greedy::settle;
pub use heap::{HeapHandle, IndexedMaxHeap};
pub use metrics::SettlementMetrics;
pub use netting::{net_balances, NetBalances};
pub use orchestrator::SettlementOrchestrator;
