//! Splitroom Ledger Core
//!
//! Room ledger model and persistence boundary for the settlement engine.
//!
//! # Architecture
//!
//! - **Rooms**: a shared context grouping participants and their entries
//! - **Ledger entries**: immutable money movements (expense, income, transfer)
//! - **Settlement snapshots**: the current reduced transfer set per room,
//!   replaced wholesale on every recomputation
//! - **Stores**: [`LedgerStore`] implemented in memory and on RocksDB
//!
//! # Invariants
//!
//! - Entry amounts are strictly positive integers (minor units)
//! - Entries are never modified, only created or deleted
//! - A snapshot replace is atomic: readers see the old or the new set, never a mix

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod memory;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::{Config, StorageBackend};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use storage::Storage;
pub use store::{open_store, LedgerStore};
pub use types::{
    EntryId, EntryKind, GroupId, LedgerEntry, NewEntry, ParticipantId, Room, RoomId,
    SettlementSnapshot, SettlementTransfer,
};
