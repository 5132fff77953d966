//! Property-based tests for settlement invariants
//!
//! - Conservation: net positions always sum to zero
//! - Settlement conservation: transfers reproduce every net position
//! - Boundedness: at most `nonzero participants - 1` transfers
//! - Self-entries never move a balance

use ledger_core::{EntryKind, LedgerEntry, NewEntry, ParticipantId, RoomId};
use proptest::prelude::*;
use settlement::{net_balances, settle};
use std::collections::HashMap;

/// Strategy for generating entry amounts
fn amount_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000
}

/// Strategy for generating a room's entries over a small participant pool,
/// as (source index, destination index, amount)
fn entries_strategy(max_entries: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize, i64)>)> {
    (2usize..12).prop_flat_map(move |participants| {
        let entry = (0..participants, 0..participants, amount_strategy());
        (Just(participants), prop::collection::vec(entry, 0..max_entries))
    })
}

fn materialize(room_id: RoomId, pool: &[ParticipantId], raw: &[(usize, usize, i64)]) -> Vec<LedgerEntry> {
    raw.iter()
        .map(|(s, d, amount)| {
            NewEntry::new(pool[*s], pool[*d], *amount)
                .into_entry(room_id, None, EntryKind::Expense)
                .unwrap()
        })
        .collect()
}

fn pool(size: usize) -> Vec<ParticipantId> {
    (0..size).map(|_| ParticipantId::generate()).collect()
}

proptest! {
    #[test]
    fn net_balances_sum_to_zero((size, raw) in entries_strategy(64)) {
        let room_id = RoomId::generate();
        let entries = materialize(room_id, &pool(size), &raw);

        let balances = net_balances(&entries).unwrap();
        prop_assert_eq!(balances.total(), 0);
    }

    #[test]
    fn transfers_reproduce_balances((size, raw) in entries_strategy(64)) {
        let room_id = RoomId::generate();
        let entries = materialize(room_id, &pool(size), &raw);
        let balances = net_balances(&entries).unwrap();

        let transfers = settle(room_id, &balances).unwrap();

        let mut settled: HashMap<ParticipantId, i64> = HashMap::new();
        for transfer in &transfers {
            prop_assert!(transfer.amount > 0);
            prop_assert_ne!(transfer.source, transfer.destination);
            *settled.entry(transfer.source).or_insert(0) -= transfer.amount;
            *settled.entry(transfer.destination).or_insert(0) += transfer.amount;
        }

        for (participant, balance) in &balances {
            prop_assert_eq!(settled.get(participant).copied().unwrap_or(0), *balance);
        }
    }

    #[test]
    fn transfer_count_is_bounded((size, raw) in entries_strategy(64)) {
        let room_id = RoomId::generate();
        let entries = materialize(room_id, &pool(size), &raw);
        let balances = net_balances(&entries).unwrap();

        let transfers = settle(room_id, &balances).unwrap();
        prop_assert!(transfers.len() <= balances.nonzero_count().saturating_sub(1));
    }

    #[test]
    fn self_entries_do_not_change_balances(
        (size, raw) in entries_strategy(32),
        self_amounts in prop::collection::vec(amount_strategy(), 1..8),
    ) {
        let room_id = RoomId::generate();
        let participants = pool(size);
        let entries = materialize(room_id, &participants, &raw);

        let mut with_self = entries.clone();
        for (i, amount) in self_amounts.iter().enumerate() {
            let who = participants[i % size];
            with_self.push(
                NewEntry::new(who, who, *amount)
                    .into_entry(room_id, None, EntryKind::Transfer)
                    .unwrap(),
            );
        }

        let before = net_balances(&entries).unwrap();
        let after = net_balances(&with_self).unwrap();

        for participant in &participants {
            prop_assert_eq!(before.get(participant), after.get(participant));
        }
        prop_assert_eq!(
            settle(room_id, &before).unwrap(),
            settle(room_id, &after).unwrap()
        );
    }
}
