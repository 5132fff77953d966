//! Balance netting
//!
//! Collapses a room's ledger entries into one signed position per
//! participant.
//!
//! # Example
//!
//! ```text
//! Entries:
//!   A -> B: 10
//!   A -> C: 20
//!   B -> C: 50
//!
//! Net positions:
//!   A: -30 (debtor)
//!   B: -40 (debtor)
//!   C: +70 (creditor)
//! ```
//!
//! Positions always sum to zero: every entry moves the same amount out of one
//! participant and into another. Entries whose source and destination match
//! are skipped.

use crate::{Error, Result};
use ledger_core::{LedgerEntry, ParticipantId};
use std::collections::btree_map::{self, BTreeMap};

/// Signed net position per participant, ordered by participant id
///
/// Negative values are owed by the participant, positive values are owed to
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetBalances {
    balances: BTreeMap<ParticipantId, i64>,
}

impl NetBalances {
    /// Position of one participant, zero if unknown
    pub fn get(&self, participant: &ParticipantId) -> i64 {
        self.balances.get(participant).copied().unwrap_or(0)
    }

    /// Participants tracked, including zero positions
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// True when no participant appeared in any entry
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Participants with a non-zero position
    pub fn nonzero_count(&self) -> usize {
        self.balances.values().filter(|b| **b != 0).count()
    }

    /// Sum of all positions, widened so it cannot overflow
    pub fn total(&self) -> i128 {
        self.balances.values().map(|b| i128::from(*b)).sum()
    }

    /// Iterate positions in participant order
    pub fn iter(&self) -> btree_map::Iter<'_, ParticipantId, i64> {
        self.balances.iter()
    }
}

impl FromIterator<(ParticipantId, i64)> for NetBalances {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, i64)>>(iter: I) -> Self {
        Self {
            balances: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a NetBalances {
    type Item = (&'a ParticipantId, &'a i64);
    type IntoIter = btree_map::Iter<'a, ParticipantId, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.balances.iter()
    }
}

/// Reduce ledger entries to net positions, O(E)
///
/// No entries yields empty balances.
pub fn net_balances(entries: &[LedgerEntry]) -> Result<NetBalances> {
    let mut balances: BTreeMap<ParticipantId, i64> = BTreeMap::new();

    for entry in entries {
        balances.entry(entry.source).or_insert(0);
        balances.entry(entry.destination).or_insert(0);

        if entry.is_self_entry() {
            continue;
        }

        apply(&mut balances, entry.source, |b| b.checked_sub(entry.amount))?;
        apply(&mut balances, entry.destination, |b| b.checked_add(entry.amount))?;
    }

    Ok(NetBalances { balances })
}

fn apply(
    balances: &mut BTreeMap<ParticipantId, i64>,
    participant: ParticipantId,
    op: impl FnOnce(i64) -> Option<i64>,
) -> Result<()> {
    let balance = balances.entry(participant).or_insert(0);
    *balance = op(*balance).ok_or(Error::BalanceOverflow(participant))?;
    Ok(())
}
