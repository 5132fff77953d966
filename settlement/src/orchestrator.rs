//! Settlement orchestrator
//!
//! Recomputes a room's settlement snapshot after every ledger mutation:
//!
//! 1. **Lock**: acquire the room's async mutex (rooms proceed in parallel)
//! 2. **Load**: read every ledger entry of the room
//! 3. **Net**: reduce entries to per-participant positions
//! 4. **Settle**: greedy largest-debtor / largest-creditor matching
//! 5. **Replace**: swap the stored snapshot atomically
//!
//! Holding the room lock from load to replace means the last recompute to
//! run always sees every committed write, so concurrent mutations in one
//! room cannot leave a snapshot that misses one of them.

use crate::{
    greedy::settle,
    metrics::SettlementMetrics,
    netting::net_balances,
    Error, Result,
};
use dashmap::{DashMap, DashSet};
use ledger_core::{LedgerStore, RoomId, SettlementSnapshot};
use std::{sync::Arc, time::Instant};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Serializes and runs per-room settlement recomputation
pub struct SettlementOrchestrator {
    store: Arc<dyn LedgerStore>,
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
    stale_rooms: DashSet<RoomId>,
    metrics: SettlementMetrics,
}

impl std::fmt::Debug for SettlementOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementOrchestrator")
            .field("rooms", &self.room_locks.len())
            .field("stale_rooms", &self.stale_rooms.len())
            .finish_non_exhaustive()
    }
}

impl SettlementOrchestrator {
    /// Create orchestrator over `store`
    pub fn new(store: Arc<dyn LedgerStore>) -> Result<Self> {
        Ok(Self {
            store,
            room_locks: DashMap::new(),
            stale_rooms: DashSet::new(),
            metrics: SettlementMetrics::new()?,
        })
    }

    /// Recompute and persist the room's snapshot
    ///
    /// Store failures surface as [`Error::RecomputeFailed`] and leave the
    /// previous snapshot in place. The room is then reported by
    /// [`is_stale`](Self::is_stale) until a later recompute succeeds.
    pub async fn recompute(&self, room_id: RoomId) -> Result<SettlementSnapshot> {
        let lock = self.room_lock(room_id);
        let result = {
            let _guard = lock.lock().await;
            self.recompute_timed(room_id).await
        };
        drop(lock);

        // Only the map holds the lock once no caller waits on it
        self.room_locks
            .remove_if(&room_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn recompute_timed(&self, room_id: RoomId) -> Result<SettlementSnapshot> {
        let started = Instant::now();
        let result = self.recompute_locked(room_id).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(snapshot) => {
                self.stale_rooms.remove(&room_id);
                self.metrics
                    .record_recompute(snapshot.len(), elapsed.as_secs_f64());
                info!(
                    room_id = %room_id,
                    transfers = snapshot.len(),
                    total = snapshot.total_amount(),
                    elapsed_us = elapsed.as_micros() as u64,
                    "Settlement recomputed"
                );
            }
            Err(e) => {
                self.stale_rooms.insert(room_id);
                self.metrics.record_failure(elapsed.as_secs_f64());
                error!(room_id = %room_id, error = %e, "Settlement recompute failed");
            }
        }

        result
    }

    async fn recompute_locked(&self, room_id: RoomId) -> Result<SettlementSnapshot> {
        let entries = self
            .store
            .list_entries(room_id)
            .await
            .map_err(|source| Error::RecomputeFailed { room_id, source })?;

        let transfers = if entries.is_empty() {
            Vec::new()
        } else {
            let balances = net_balances(&entries)?;
            settle(room_id, &balances)?
        };

        self.store
            .replace_snapshot(room_id, &transfers)
            .await
            .map_err(|source| Error::RecomputeFailed { room_id, source })?;

        Ok(SettlementSnapshot { room_id, transfers })
    }

    fn room_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        self.room_locks.entry(room_id).or_default().clone()
    }

    /// True if the room's last recompute failed
    pub fn is_stale(&self, room_id: RoomId) -> bool {
        self.stale_rooms.contains(&room_id)
    }

    /// Rooms whose stored snapshot may lag the ledger
    pub fn stale_rooms(&self) -> Vec<RoomId> {
        self.stale_rooms.iter().map(|r| *r).collect()
    }

    /// Settlement metrics
    pub fn metrics(&self) -> &SettlementMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledger_core::{
        EntryId, EntryKind, GroupId, LedgerEntry, MemoryStore, NewEntry, ParticipantId, Room,
        SettlementTransfer,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn setup() -> (Arc<MemoryStore>, SettlementOrchestrator, RoomId) {
        let store = Arc::new(MemoryStore::new());
        let room = store.create_room(Room::new("trip")).await.unwrap();
        let orchestrator = SettlementOrchestrator::new(store.clone()).unwrap();
        (store, orchestrator, room.room_id)
    }

    fn entry(room_id: RoomId, source: ParticipantId, destination: ParticipantId, amount: i64) -> LedgerEntry {
        NewEntry::new(source, destination, amount)
            .into_entry(room_id, None, EntryKind::Expense)
            .unwrap()
    }

    #[tokio::test]
    async fn test_recompute_persists_snapshot() {
        let (store, orchestrator, room_id) = setup().await;
        let (a, b, c) = (
            ParticipantId::generate(),
            ParticipantId::generate(),
            ParticipantId::generate(),
        );
        store
            .insert_entries(&[entry(room_id, a, b, 10), entry(room_id, a, c, 20)])
            .await
            .unwrap();
        store.insert_entries(&[entry(room_id, b, c, 50)]).await.unwrap();

        let snapshot = orchestrator.recompute(room_id).await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.total_amount(), 70);
        assert_eq!(store.get_snapshot(room_id).await.unwrap(), snapshot.transfers);
        assert_eq!(orchestrator.metrics().recomputes_total.get(), 1);
    }

    #[tokio::test]
    async fn test_empty_room_clears_snapshot() {
        let (store, orchestrator, room_id) = setup().await;
        let stale = SettlementTransfer {
            room_id,
            source: ParticipantId::generate(),
            destination: ParticipantId::generate(),
            amount: 5,
        };
        store.replace_snapshot(room_id, &[stale]).await.unwrap();

        let snapshot = orchestrator.recompute(room_id).await.unwrap();

        assert!(snapshot.is_empty());
        assert!(store.get_snapshot(room_id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_all_reflected() {
        let (store, orchestrator, room_id) = setup().await;
        let orchestrator = Arc::new(orchestrator);
        let hub = ParticipantId::generate();

        let mut tasks = Vec::new();
        for amount in 1..=16i64 {
            let store = store.clone();
            let orchestrator = orchestrator.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .insert_entries(&[entry(room_id, ParticipantId::generate(), hub, amount)])
                    .await
                    .unwrap();
                orchestrator.recompute(room_id).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = store.get_snapshot(room_id).await.unwrap();
        assert_eq!(snapshot.len(), 16);
        assert_eq!(snapshot.iter().map(|t| t.amount).sum::<i64>(), (1..=16).sum::<i64>());

        // Idle rooms keep no lock
        assert!(orchestrator.room_locks.is_empty());
    }

    #[tokio::test]
    async fn test_room_lock_released_after_failure() {
        let (_store, orchestrator, _room_id) = setup().await;

        let missing = RoomId::generate();
        assert!(matches!(
            orchestrator.recompute(missing).await,
            Err(Error::RecomputeFailed { .. })
        ));
        assert!(orchestrator.is_stale(missing));
        assert!(orchestrator.room_locks.is_empty());
    }

    /// Delegates to a [`MemoryStore`] but can be told to fail snapshot writes
    struct FlakyStore {
        inner: MemoryStore,
        fail_replace: AtomicBool,
    }

    #[async_trait]
    impl LedgerStore for FlakyStore {
        async fn create_room(&self, room: Room) -> ledger_core::Result<Room> {
            self.inner.create_room(room).await
        }
        async fn get_room(&self, room_id: RoomId) -> ledger_core::Result<Room> {
            self.inner.get_room(room_id).await
        }
        async fn add_member(&self, room_id: RoomId, p: ParticipantId) -> ledger_core::Result<bool> {
            self.inner.add_member(room_id, p).await
        }
        async fn remove_member(&self, room_id: RoomId, p: ParticipantId) -> ledger_core::Result<bool> {
            self.inner.remove_member(room_id, p).await
        }
        async fn list_members(&self, room_id: RoomId) -> ledger_core::Result<Vec<ParticipantId>> {
            self.inner.list_members(room_id).await
        }
        async fn insert_entries(&self, entries: &[LedgerEntry]) -> ledger_core::Result<()> {
            self.inner.insert_entries(entries).await
        }
        async fn delete_entry(&self, room_id: RoomId, id: EntryId) -> ledger_core::Result<LedgerEntry> {
            self.inner.delete_entry(room_id, id).await
        }
        async fn delete_group(
            &self,
            room_id: RoomId,
            id: GroupId,
        ) -> ledger_core::Result<Vec<LedgerEntry>> {
            self.inner.delete_group(room_id, id).await
        }
        async fn list_entries(&self, room_id: RoomId) -> ledger_core::Result<Vec<LedgerEntry>> {
            self.inner.list_entries(room_id).await
        }
        async fn replace_snapshot(
            &self,
            room_id: RoomId,
            transfers: &[SettlementTransfer],
        ) -> ledger_core::Result<()> {
            if self.fail_replace.load(Ordering::SeqCst) {
                return Err(ledger_core::Error::Storage("disk full".to_string()));
            }
            self.inner.replace_snapshot(room_id, transfers).await
        }
        async fn get_snapshot(&self, room_id: RoomId) -> ledger_core::Result<Vec<SettlementTransfer>> {
            self.inner.get_snapshot(room_id).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_marks_room_stale() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_replace: AtomicBool::new(true),
        });
        let room_id = store.create_room(Room::new("flaky")).await.unwrap().room_id;
        let orchestrator = SettlementOrchestrator::new(store.clone()).unwrap();
        store
            .insert_entries(&[entry(room_id, ParticipantId::generate(), ParticipantId::generate(), 9)])
            .await
            .unwrap();

        let result = orchestrator.recompute(room_id).await;
        assert!(matches!(result, Err(Error::RecomputeFailed { room_id: r, .. }) if r == room_id));
        assert!(orchestrator.is_stale(room_id));
        assert_eq!(orchestrator.stale_rooms(), vec![room_id]);
        assert!(store.get_snapshot(room_id).await.unwrap().is_empty());
        assert_eq!(orchestrator.metrics().recompute_failures_total.get(), 1);

        store.fail_replace.store(false, Ordering::SeqCst);
        let snapshot = orchestrator.recompute(room_id).await.unwrap();
        assert_eq!(snapshot.total_amount(), 9);
        assert!(!orchestrator.is_stale(room_id));
    }
}
