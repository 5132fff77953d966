//! In-memory ledger store
//!
//! All state lives behind a single `RwLock`, so every trait operation is one
//! critical section and therefore atomic with respect to readers.

use crate::{
    error::{Error, Result},
    store::{single_room, LedgerStore},
    types::{EntryId, GroupId, LedgerEntry, ParticipantId, Room, RoomId, SettlementTransfer},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug)]
struct RoomRecord {
    room: Room,
    entries: Vec<LedgerEntry>,
    snapshot: Vec<SettlementTransfer>,
    members: BTreeSet<ParticipantId>,
}

impl RoomRecord {
    fn new(room: Room) -> Self {
        Self {
            room,
            entries: Vec::new(),
            snapshot: Vec::new(),
            members: BTreeSet::new(),
        }
    }
}

/// Process-local [`LedgerStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<RoomId, RoomRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms held
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}

fn room_not_found(room_id: RoomId) -> Error {
    Error::RoomNotFound(room_id.to_string())
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_room(&self, room: Room) -> Result<Room> {
        let mut rooms = self.rooms.write();

        if rooms.values().any(|r| r.room.name == room.name) {
            return Err(Error::RoomExists(room.name));
        }

        rooms.insert(room.room_id, RoomRecord::new(room.clone()));
        Ok(room)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        self.rooms
            .read()
            .get(&room_id)
            .map(|r| r.room.clone())
            .ok_or_else(|| room_not_found(room_id))
    }

    async fn add_member(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool> {
        let mut rooms = self.rooms.write();
        let record = rooms.get_mut(&room_id).ok_or_else(|| room_not_found(room_id))?;
        Ok(record.members.insert(participant))
    }

    async fn remove_member(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool> {
        let mut rooms = self.rooms.write();
        let record = rooms.get_mut(&room_id).ok_or_else(|| room_not_found(room_id))?;
        Ok(record.members.remove(&participant))
    }

    async fn list_members(&self, room_id: RoomId) -> Result<Vec<ParticipantId>> {
        Ok(self
            .rooms
            .read()
            .get(&room_id)
            .map(|r| r.members.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn insert_entries(&self, entries: &[LedgerEntry]) -> Result<()> {
        let Some(room_id) = single_room(entries)? else {
            return Ok(());
        };

        let mut rooms = self.rooms.write();
        let record = rooms.get_mut(&room_id).ok_or_else(|| room_not_found(room_id))?;
        record.entries.extend_from_slice(entries);
        Ok(())
    }

    async fn delete_entry(&self, room_id: RoomId, entry_id: EntryId) -> Result<LedgerEntry> {
        let mut rooms = self.rooms.write();
        let record = rooms.get_mut(&room_id).ok_or_else(|| room_not_found(room_id))?;

        let position = record
            .entries
            .iter()
            .position(|e| e.entry_id == entry_id)
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;

        Ok(record.entries.remove(position))
    }

    async fn delete_group(&self, room_id: RoomId, group_id: GroupId) -> Result<Vec<LedgerEntry>> {
        let mut rooms = self.rooms.write();
        let record = rooms.get_mut(&room_id).ok_or_else(|| room_not_found(room_id))?;

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut record.entries)
            .into_iter()
            .partition(|e| e.group_id == Some(group_id));
        record.entries = kept;

        if removed.is_empty() {
            return Err(Error::GroupNotFound(group_id.to_string()));
        }

        Ok(removed)
    }

    async fn list_entries(&self, room_id: RoomId) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .rooms
            .read()
            .get(&room_id)
            .map(|r| r.entries.clone())
            .unwrap_or_default())
    }

    async fn replace_snapshot(
        &self,
        room_id: RoomId,
        transfers: &[SettlementTransfer],
    ) -> Result<()> {
        let mut rooms = self.rooms.write();
        let record = rooms.get_mut(&room_id).ok_or_else(|| room_not_found(room_id))?;
        record.snapshot = transfers.to_vec();
        Ok(())
    }

    async fn get_snapshot(&self, room_id: RoomId) -> Result<Vec<SettlementTransfer>> {
        Ok(self
            .rooms
            .read()
            .get(&room_id)
            .map(|r| r.snapshot.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryKind, NewEntry};

    async fn store_with_room() -> (MemoryStore, RoomId) {
        let store = MemoryStore::new();
        let room = store.create_room(Room::new("flat-42")).await.unwrap();
        (store, room.room_id)
    }

    fn entry(room_id: RoomId, group: Option<GroupId>, amount: i64) -> LedgerEntry {
        NewEntry::new(ParticipantId::generate(), ParticipantId::generate(), amount)
            .into_entry(room_id, group, EntryKind::Expense)
            .unwrap()
    }

    #[tokio::test]
    async fn test_room_names_are_unique() {
        let (store, _) = store_with_room().await;
        let result = store.create_room(Room::new("flat-42")).await;
        assert!(matches!(result, Err(Error::RoomExists(_))));
        assert_eq!(store.room_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_requires_room() {
        let store = MemoryStore::new();
        let result = store.insert_entries(&[entry(RoomId::generate(), None, 10)]).await;
        assert!(matches!(result, Err(Error::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_rejects_mixed_rooms() {
        let (store, room_id) = store_with_room().await;
        let entries = vec![entry(room_id, None, 10), entry(RoomId::generate(), None, 20)];

        let result = store.insert_entries(&entries).await;
        assert!(matches!(result, Err(Error::InvalidEntry(_))));
        assert!(store.list_entries(room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_list_delete() {
        let (store, room_id) = store_with_room().await;
        let first = entry(room_id, None, 10);
        let second = entry(room_id, None, 20);
        store
            .insert_entries(&[first.clone(), second.clone()])
            .await
            .unwrap();

        let listed = store.list_entries(room_id).await.unwrap();
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        let deleted = store.delete_entry(room_id, first.entry_id).await.unwrap();
        assert_eq!(deleted, first);
        assert_eq!(store.list_entries(room_id).await.unwrap(), vec![second]);

        let missing = store.delete_entry(room_id, first.entry_id).await;
        assert!(matches!(missing, Err(Error::EntryNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_group() {
        let (store, room_id) = store_with_room().await;
        let group = GroupId::generate();
        let loose = entry(room_id, None, 5);
        store
            .insert_entries(&[entry(room_id, Some(group), 10), loose.clone()])
            .await
            .unwrap();
        store
            .insert_entries(&[entry(room_id, Some(group), 15)])
            .await
            .unwrap();

        let removed = store.delete_group(room_id, group).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.list_entries(room_id).await.unwrap(), vec![loose]);

        let again = store.delete_group(room_id, group).await;
        assert!(matches!(again, Err(Error::GroupNotFound(_))));
    }

    #[tokio::test]
    async fn test_replace_snapshot() {
        let (store, room_id) = store_with_room().await;
        let transfer = SettlementTransfer {
            room_id,
            source: ParticipantId::generate(),
            destination: ParticipantId::generate(),
            amount: 70,
        };

        store.replace_snapshot(room_id, &[transfer, transfer]).await.unwrap();
        assert_eq!(store.get_snapshot(room_id).await.unwrap().len(), 2);

        store.replace_snapshot(room_id, &[]).await.unwrap();
        assert!(store.get_snapshot(room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_members() {
        let (store, room_id) = store_with_room().await;
        let alice = ParticipantId::generate();

        assert!(store.add_member(room_id, alice).await.unwrap());
        assert!(!store.add_member(room_id, alice).await.unwrap());
        assert_eq!(store.list_members(room_id).await.unwrap(), vec![alice]);

        assert!(store.remove_member(room_id, alice).await.unwrap());
        assert!(!store.remove_member(room_id, alice).await.unwrap());
        assert!(store.list_members(room_id).await.unwrap().is_empty());
        assert!(matches!(
            store.remove_member(RoomId::generate(), alice).await,
            Err(Error::RoomNotFound(_))
        ));
    }
}
