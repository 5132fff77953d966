//! Room mutation and read operations
//!
//! Every mutation follows the same path:
//!
//! 1. Commit the ledger write
//! 2. Recompute the room's settlement under its room lock
//! 3. Broadcast the write plus the new settlement to everyone but the actor
//!
//! A failed recompute after a successful commit is reported as
//! [`Error::SettlementStale`] and nothing is broadcast; the room stays
//! flagged until a later mutation or [`RoomService::resimplify`] succeeds.

use crate::{config::ServiceConfig, Error, Result};
use fanout::{BroadcastReport, RoomRegistry, RoomUpdate, Subscription};
use ledger_core::{
    open_store, EntryId, EntryKind, GroupId, LedgerEntry, LedgerStore, NewEntry, ParticipantId,
    Room, RoomId, SettlementSnapshot, SettlementTransfer,
};
use serde::Serialize;
use settlement::SettlementOrchestrator;
use std::sync::Arc;
use tracing::{info, warn};

/// Ledger change that has been committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedChange {
    /// Room the change belongs to
    pub room_id: RoomId,
    /// Created entries
    pub added: Vec<LedgerEntry>,
    /// Deleted entries
    pub deleted: Vec<LedgerEntry>,
}

impl CommittedChange {
    fn added(room_id: RoomId, entries: Vec<LedgerEntry>) -> Self {
        Self {
            room_id,
            added: entries,
            deleted: Vec::new(),
        }
    }

    fn deleted(room_id: RoomId, entries: Vec<LedgerEntry>) -> Self {
        Self {
            room_id,
            added: Vec::new(),
            deleted: entries,
        }
    }
}

/// Result of a successful mutation
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Committed change
    pub change: CommittedChange,
    /// Settlement after the change
    pub snapshot: SettlementSnapshot,
    /// Fan-out result
    pub broadcast: BroadcastReport,
}

/// On-demand view of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomState {
    /// Room record
    pub room: Room,
    /// Entries in creation order
    pub entries: Vec<LedgerEntry>,
    /// Stored settlement
    pub transfers: Vec<SettlementTransfer>,
    /// Members ordered by participant id
    pub members: Vec<ParticipantId>,
    /// True if the stored settlement may lag the entries
    pub stale: bool,
}

/// Mutation trigger and read interface for rooms
pub struct RoomService {
    store: Arc<dyn LedgerStore>,
    orchestrator: SettlementOrchestrator,
    registry: Arc<RoomRegistry>,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService")
            .field("orchestrator", &self.orchestrator)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl RoomService {
    /// Create service over an existing store and registry
    pub fn new(store: Arc<dyn LedgerStore>, registry: Arc<RoomRegistry>) -> Result<Self> {
        let orchestrator = SettlementOrchestrator::new(store.clone())?;
        Ok(Self {
            store,
            orchestrator,
            registry,
        })
    }

    /// Open the configured store and a fresh registry
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let store = open_store(&config.ledger)?;
        let registry = RoomRegistry::new(config.subscribers.clone())?;
        Self::new(store, registry)
    }

    /// Subscription registry
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Settlement orchestrator
    pub fn orchestrator(&self) -> &SettlementOrchestrator {
        &self.orchestrator
    }

    // ROOMS

    /// Create a room with `creator` as its first member
    pub async fn create_room(&self, name: impl Into<String>, creator: ParticipantId) -> Result<Room> {
        let room = self.store.create_room(Room::new(name)).await?;
        self.store.add_member(room.room_id, creator).await?;
        Ok(room)
    }

    /// Add `participant` to the room
    ///
    /// A new member is announced to the room's other subscribers together
    /// with the current settlement. Returns `false` if already a member.
    pub async fn join_room(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool> {
        if !self.store.add_member(room_id, participant).await? {
            return Ok(false);
        }

        let transfers = self.store.get_snapshot(room_id).await?;
        let update =
            RoomUpdate::new(room_id, participant, transfers).with_member_joined(participant);
        self.registry.broadcast(room_id, participant, update);

        info!(room_id = %room_id, participant = %participant, "Member joined");
        Ok(true)
    }

    /// Remove `participant` from the room
    ///
    /// Remaining subscribers are told about the departure. Entries the
    /// participant took part in stay on the ledger, so the settlement is
    /// unchanged. Returns `false` if not a member.
    pub async fn leave_room(&self, room_id: RoomId, participant: ParticipantId) -> Result<bool> {
        if !self.store.remove_member(room_id, participant).await? {
            return Ok(false);
        }

        let transfers = self.store.get_snapshot(room_id).await?;
        let update =
            RoomUpdate::new(room_id, participant, transfers).with_member_left(participant);
        self.registry.broadcast(room_id, participant, update);

        info!(room_id = %room_id, participant = %participant, "Member left");
        Ok(true)
    }

    /// Open a live subscription for a participant of an existing room
    pub async fn subscribe(&self, room_id: RoomId, participant: ParticipantId) -> Result<Subscription> {
        self.store.get_room(room_id).await?;
        Ok(self.registry.subscribe(room_id, participant))
    }

    /// Entries, settlement and members of a room
    pub async fn room_state(&self, room_id: RoomId) -> Result<RoomState> {
        let room = self.store.get_room(room_id).await?;
        let entries = self.store.list_entries(room_id).await?;
        let transfers = self.store.get_snapshot(room_id).await?;
        let members = self.store.list_members(room_id).await?;

        Ok(RoomState {
            room,
            entries,
            transfers,
            members,
            stale: self.orchestrator.is_stale(room_id),
        })
    }

    // ENTRIES

    /// Record one entry of `kind`
    pub async fn create_entry(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        kind: EntryKind,
        entry: NewEntry,
    ) -> Result<MutationOutcome> {
        let entry = entry.into_entry(room_id, None, kind)?;
        self.store.insert_entries(std::slice::from_ref(&entry)).await?;

        self.settle_and_publish(actor, CommittedChange::added(room_id, vec![entry]))
            .await
    }

    /// Record a direct payment between two participants
    pub async fn create_transfer(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        entry: NewEntry,
    ) -> Result<MutationOutcome> {
        self.create_entry(room_id, actor, EntryKind::Transfer, entry)
            .await
    }

    /// Record a split expense as one group of entries
    pub async fn create_group_expense(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        entries: Vec<NewEntry>,
    ) -> Result<MutationOutcome> {
        self.create_group(room_id, actor, EntryKind::Expense, entries)
            .await
    }

    /// Record a split income as one group of entries
    pub async fn create_group_income(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        entries: Vec<NewEntry>,
    ) -> Result<MutationOutcome> {
        self.create_group(room_id, actor, EntryKind::Income, entries)
            .await
    }

    async fn create_group(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        kind: EntryKind,
        entries: Vec<NewEntry>,
    ) -> Result<MutationOutcome> {
        if entries.is_empty() {
            return Err(Error::InvalidRequest(
                "group must contain at least one entry".to_string(),
            ));
        }

        let group_id = GroupId::generate();
        let entries = entries
            .into_iter()
            .map(|e| e.into_entry(room_id, Some(group_id), kind))
            .collect::<ledger_core::Result<Vec<_>>>()?;

        // All or nothing
        self.store.insert_entries(&entries).await?;

        self.settle_and_publish(actor, CommittedChange::added(room_id, entries))
            .await
    }

    /// Delete one entry
    pub async fn delete_entry(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        entry_id: EntryId,
    ) -> Result<MutationOutcome> {
        let removed = self.store.delete_entry(room_id, entry_id).await?;

        self.settle_and_publish(actor, CommittedChange::deleted(room_id, vec![removed]))
            .await
    }

    /// Delete every entry of a group
    pub async fn delete_group(
        &self,
        room_id: RoomId,
        actor: ParticipantId,
        group_id: GroupId,
    ) -> Result<MutationOutcome> {
        let removed = self.store.delete_group(room_id, group_id).await?;

        self.settle_and_publish(actor, CommittedChange::deleted(room_id, removed))
            .await
    }

    /// Recompute and broadcast without a ledger change
    pub async fn resimplify(&self, room_id: RoomId, actor: ParticipantId) -> Result<MutationOutcome> {
        self.store.get_room(room_id).await?;

        self.settle_and_publish(actor, CommittedChange::added(room_id, Vec::new()))
            .await
    }

    async fn settle_and_publish(
        &self,
        actor: ParticipantId,
        change: CommittedChange,
    ) -> Result<MutationOutcome> {
        let room_id = change.room_id;

        let snapshot = match self.orchestrator.recompute(room_id).await {
            Ok(snapshot) => snapshot,
            Err(source) => {
                warn!(
                    room_id = %room_id,
                    added = change.added.len(),
                    deleted = change.deleted.len(),
                    "Change committed but settlement is stale"
                );
                return Err(Error::SettlementStale {
                    change: Box::new(change),
                    source,
                });
            }
        };

        let update = RoomUpdate::new(room_id, actor, snapshot.transfers.clone())
            .with_added(change.added.clone())
            .with_deleted(change.deleted.clone());
        let broadcast = self.registry.broadcast(room_id, actor, update);

        Ok(MutationOutcome {
            change,
            snapshot,
            broadcast,
        })
    }
}
