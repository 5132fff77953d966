//! Benchmark: settlement computation
//!
//! Covers:
//!   - net_balances over a room's entries
//!   - settle (greedy matching) over the resulting positions

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ledger_core::{EntryKind, LedgerEntry, NewEntry, ParticipantId, RoomId};
use settlement::{net_balances, settle};

/// Deterministic entries cycling through `participants`
fn seed_entries(room_id: RoomId, participants: usize, entries: usize) -> Vec<LedgerEntry> {
    let pool: Vec<ParticipantId> = (0..participants).map(|_| ParticipantId::generate()).collect();

    (0..entries)
        .map(|i| {
            let source = pool[i % participants];
            let destination = pool[(i * 7 + 3) % participants];
            let amount = (i as i64 % 997) + 1;
            NewEntry::new(source, destination, amount)
                .into_entry(room_id, None, EntryKind::Expense)
                .unwrap()
        })
        .collect()
}

fn bench_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement");
    let room_id = RoomId::generate();

    for (participants, entries) in [(5, 100), (20, 1_000), (100, 10_000)] {
        let seeded = seed_entries(room_id, participants, entries);
        let balances = net_balances(&seeded).unwrap();
        let label = format!("{}p/{}e", participants, entries);

        group.bench_with_input(BenchmarkId::new("net_balances", &label), &seeded, |b, seeded| {
            b.iter(|| net_balances(black_box(seeded)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("settle", &label), &balances, |b, balances| {
            b.iter(|| settle(room_id, black_box(balances)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_settlement);
criterion_main!(benches);
