//! Persistence boundary for the room ledger
//!
//! The settlement engine only talks to storage through [`LedgerStore`].
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`](crate::MemoryStore) - process-local, for tests and
//!   single-node development
//! - [`Storage`](crate::Storage) - RocksDB column families, atomic write batches

use crate::{
    types::{EntryId, GroupId, LedgerEntry, ParticipantId, Room, RoomId, SettlementTransfer},
    Config, MemoryStore, Result, StorageBackend, Storage,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage contract used by the settlement orchestrator and room service
///
/// Implementors MUST:
/// 1. Make `insert_entries` all-or-nothing for the given slice
/// 2. Make `replace_snapshot` atomic: delete the prior snapshot and insert the
///    new one so that no reader ever observes a partial set
/// 3. Return entries from `list_entries` in creation order
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ROOMS
    /// Create a room; names are unique
    async fn create_room(&self, room: Room) -> Result<Room>;
    /// Look up a room
    async fn get_room(&self, room_id: RoomId) -> Result<Room>;
    /// Add a member; returns `false` if the participant was already a member
    async fn add_member(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool>;
    /// Remove a member; returns `false` if the participant was not a member
    async fn remove_member(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool>;
    /// Room members ordered by participant id
    async fn list_members(&self, room_id: RoomId) -> Result<Vec<ParticipantId>>;

    // LEDGER ENTRIES
    /// Insert entries for a single room atomically
    async fn insert_entries(&self, entries: &[LedgerEntry]) -> Result<()>;
    /// Delete one entry, returning it
    async fn delete_entry(&self, room_id: RoomId, entry_id: EntryId) -> Result<LedgerEntry>;
    /// Delete every entry of a group, returning them
    async fn delete_group(&self, room_id: RoomId, group_id: GroupId) -> Result<Vec<LedgerEntry>>;
    /// All entries of a room in creation order
    async fn list_entries(&self, room_id: RoomId) -> Result<Vec<LedgerEntry>>;

    // SETTLEMENT SNAPSHOT
    /// Atomically replace the room's settlement snapshot
    async fn replace_snapshot(&self, room_id: RoomId, transfers: &[SettlementTransfer])
        -> Result<()>;
    /// Currently stored snapshot
    async fn get_snapshot(&self, room_id: RoomId) -> Result<Vec<SettlementTransfer>>;
}

/// Open the backend selected by `config`
pub fn open_store(config: &Config) -> Result<Arc<dyn LedgerStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory ledger store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::RocksDb => Ok(Arc::new(Storage::open(config)?)),
    }
}

/// Reject slices that mix rooms; returns the single room they target
pub(crate) fn single_room(entries: &[LedgerEntry]) -> Result<Option<RoomId>> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };

    if let Some(stray) = entries.iter().find(|e| e.room_id != first.room_id) {
        return Err(crate::Error::InvalidEntry(format!(
            "entry {} belongs to room {}, expected {}",
            stray.entry_id, stray.room_id, first.room_id
        )));
    }

    Ok(Some(first.room_id))
}
