//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `rooms` - Room records (key: room_id)
//! - `room_names` - Unique name index (key: name bytes -> room_id)
//! - `members` - Room membership (key: room_id || participant_id)
//! - `entries` - Ledger entries (key: room_id || entry_id)
//! - `snapshots` - Settlement transfers (key: room_id || sequence)
//!
//! Entry ids are UUIDv7, so a prefix scan over `room_id` yields entries in
//! creation order.

use crate::{
    error::{Error, Result},
    store::{single_room, LedgerStore},
    types::{EntryId, GroupId, LedgerEntry, ParticipantId, Room, RoomId, SettlementTransfer},
    Config,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::sync::Arc;

/// Column family names
const CF_ROOMS: &str = "rooms";
const CF_ROOM_NAMES: &str = "room_names";
const CF_MEMBERS: &str = "members";
const CF_ENTRIES: &str = "entries";
const CF_SNAPSHOTS: &str = "snapshots";

const ALL_CFS: [&str; 5] = [CF_ROOMS, CF_ROOM_NAMES, CF_MEMBERS, CF_ENTRIES, CF_SNAPSHOTS];

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    // Serializes the check-then-put on the unique name index
    room_names: Mutex<()>,
    // Serializes read-then-write on members and entries
    writes: Mutex<()>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Self::cf_options(name)))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(
            "Opened RocksDB at {:?} with {} column families",
            path,
            ALL_CFS.iter().filter(|name| db.cf_handle(name).is_some()).count()
        );

        Ok(Self {
            db: Arc::new(db),
            room_names: Mutex::new(()),
            writes: Mutex::new(()),
        })
    }

    fn cf_options(name: &str) -> Options {
        let mut opts = Options::default();
        match name {
            // Entries are append-mostly and scanned by room prefix
            CF_ENTRIES => {
                opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                opts.set_prefix_extractor(rocksdb::SliceTransform::create_fixed_prefix(16));
            }
            CF_ROOM_NAMES => {
                let mut block_opts = rocksdb::BlockBasedOptions::default();
                block_opts.set_bloom_filter(10.0, false); // 10 bits per key
                opts.set_block_based_table_factory(&block_opts);
            }
            _ => {
                opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
            }
        }
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn room_key(room_id: RoomId, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(16 + suffix.len());
        key.extend_from_slice(room_id.as_bytes());
        key.extend_from_slice(suffix);
        key
    }

    fn snapshot_key(room_id: RoomId, sequence: u32) -> Vec<u8> {
        Self::room_key(room_id, &sequence.to_be_bytes())
    }

    /// Visit every `(key, value)` under the room prefix of `cf_name`
    fn scan_room(&self, cf_name: &str, room_id: RoomId) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf_handle(cf_name)?;
        let prefix = room_id.as_bytes();

        let mut rows = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, prefix) {
            let (key, value) = item?;
            // Iteration continues past the prefix when no extractor matches
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key, value));
        }

        Ok(rows)
    }

    fn ensure_room(&self, room_id: RoomId) -> Result<()> {
        let cf = self.cf_handle(CF_ROOMS)?;
        match self.db.get_pinned_cf(cf, room_id.as_bytes())? {
            Some(_) => Ok(()),
            None => Err(Error::RoomNotFound(room_id.to_string())),
        }
    }

    fn decode_entries(rows: Vec<(Box<[u8]>, Box<[u8]>)>) -> Result<Vec<LedgerEntry>> {
        rows.into_iter()
            .map(|(_, value)| bincode::deserialize(&value).map_err(Error::from))
            .collect()
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for Storage {
    async fn create_room(&self, room: Room) -> Result<Room> {
        let cf_rooms = self.cf_handle(CF_ROOMS)?;
        let cf_names = self.cf_handle(CF_ROOM_NAMES)?;

        let _guard = self.room_names.lock();

        if self.db.get_pinned_cf(cf_names, room.name.as_bytes())?.is_some() {
            return Err(Error::RoomExists(room.name));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_rooms, room.room_id.as_bytes(), bincode::serialize(&room)?);
        batch.put_cf(cf_names, room.name.as_bytes(), room.room_id.as_bytes());
        self.db.write(batch)?;

        tracing::info!(room_id = %room.room_id, name = %room.name, "Room created");

        Ok(room)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        let cf = self.cf_handle(CF_ROOMS)?;
        let value = self
            .db
            .get_cf(cf, room_id.as_bytes())?
            .ok_or_else(|| Error::RoomNotFound(room_id.to_string()))?;

        Ok(bincode::deserialize(&value)?)
    }

    async fn add_member(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool> {
        self.ensure_room(room_id)?;

        let cf = self.cf_handle(CF_MEMBERS)?;
        let key = Self::room_key(room_id, participant.as_bytes());

        let _guard = self.writes.lock();
        if self.db.get_pinned_cf(cf, &key)?.is_some() {
            return Ok(false);
        }

        self.db.put_cf(cf, &key, b"")?;
        Ok(true)
    }

    async fn remove_member(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool> {
        self.ensure_room(room_id)?;

        let cf = self.cf_handle(CF_MEMBERS)?;
        let key = Self::room_key(room_id, participant.as_bytes());

        let _guard = self.writes.lock();
        if self.db.get_pinned_cf(cf, &key)?.is_none() {
            return Ok(false);
        }

        self.db.delete_cf(cf, &key)?;
        Ok(true)
    }

    async fn list_members(&self, room_id: RoomId) -> Result<Vec<ParticipantId>> {
        self.scan_room(CF_MEMBERS, room_id)?
            .into_iter()
            .map(|(key, _)| {
                let bytes = <[u8; 16]>::try_from(&key[16..])
                    .map_err(|_| Error::Storage("Malformed member key".to_string()))?;
                Ok(ParticipantId::from_uuid(uuid::Uuid::from_bytes(bytes)))
            })
            .collect()
    }

    async fn insert_entries(&self, entries: &[LedgerEntry]) -> Result<()> {
        let Some(room_id) = single_room(entries)? else {
            return Ok(());
        };
        self.ensure_room(room_id)?;

        let cf = self.cf_handle(CF_ENTRIES)?;
        let mut batch = WriteBatch::default();
        for entry in entries {
            let key = Self::room_key(room_id, entry.entry_id.as_bytes());
            batch.put_cf(cf, &key, bincode::serialize(entry)?);
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(room_id = %room_id, count = entries.len(), "Entries inserted");

        Ok(())
    }

    async fn delete_entry(&self, room_id: RoomId, entry_id: EntryId) -> Result<LedgerEntry> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        let key = Self::room_key(room_id, entry_id.as_bytes());

        let _guard = self.writes.lock();
        let value = self
            .db
            .get_cf(cf, &key)?
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;
        let entry: LedgerEntry = bincode::deserialize(&value)?;

        self.db.delete_cf(cf, &key)?;
        Ok(entry)
    }

    async fn delete_group(&self, room_id: RoomId, group_id: GroupId) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        let mut batch = WriteBatch::default();
        let mut removed = Vec::new();

        let _guard = self.writes.lock();
        for (key, value) in self.scan_room(CF_ENTRIES, room_id)? {
            let entry: LedgerEntry = bincode::deserialize(&value)?;
            if entry.group_id == Some(group_id) {
                batch.delete_cf(cf, &key);
                removed.push(entry);
            }
        }

        if removed.is_empty() {
            return Err(Error::GroupNotFound(group_id.to_string()));
        }

        self.db.write(batch)?;
        Ok(removed)
    }

    async fn list_entries(&self, room_id: RoomId) -> Result<Vec<LedgerEntry>> {
        Self::decode_entries(self.scan_room(CF_ENTRIES, room_id)?)
    }

    async fn replace_snapshot(
        &self,
        room_id: RoomId,
        transfers: &[SettlementTransfer],
    ) -> Result<()> {
        self.ensure_room(room_id)?;

        let cf = self.cf_handle(CF_SNAPSHOTS)?;
        let mut batch = WriteBatch::default();

        // 1. Drop the prior snapshot
        for (key, _) in self.scan_room(CF_SNAPSHOTS, room_id)? {
            batch.delete_cf(cf, &key);
        }

        // 2. Insert the new one, keyed by position to keep producer order
        for (sequence, transfer) in transfers.iter().enumerate() {
            let sequence = u32::try_from(sequence)
                .map_err(|_| Error::Storage("Snapshot too large".to_string()))?;
            batch.put_cf(
                cf,
                Self::snapshot_key(room_id, sequence),
                bincode::serialize(transfer)?,
            );
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(room_id = %room_id, transfers = transfers.len(), "Snapshot replaced");

        Ok(())
    }

    async fn get_snapshot(&self, room_id: RoomId) -> Result<Vec<SettlementTransfer>> {
        self.scan_room(CF_SNAPSHOTS, room_id)?
            .into_iter()
            .map(|(_, value)| bincode::deserialize(&value).map_err(Error::from))
            .collect()
    }
}
