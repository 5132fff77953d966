//! Greedy settlement
//!
//! Repeatedly pairs the largest debtor with the largest creditor and settles
//! the smaller of the two amounts. The side that reaches zero leaves its
//! heap; the other keeps its remainder in place.
//!
//! The result has at most `nonzero participants - 1` transfers. It is not
//! guaranteed to be the minimum possible number of transfers.

use crate::{
    heap::IndexedMaxHeap,
    netting::NetBalances,
    Error, Result,
};
use ledger_core::{ParticipantId, RoomId, SettlementTransfer};

/// Compute settle-up transfers for `balances`
///
/// Output order is deterministic for a given set of balances.
pub fn settle(room_id: RoomId, balances: &NetBalances) -> Result<Vec<SettlementTransfer>> {
    let mut debtors: IndexedMaxHeap<ParticipantId> = IndexedMaxHeap::with_capacity(balances.len());
    let mut creditors: IndexedMaxHeap<ParticipantId> = IndexedMaxHeap::with_capacity(balances.len());

    for (participant, balance) in balances {
        match balance.signum() {
            -1 => {
                let owed = balance
                    .checked_neg()
                    .ok_or(Error::BalanceOverflow(*participant))?;
                debtors.insert(*participant, owed);
            }
            1 => {
                creditors.insert(*participant, *balance);
            }
            _ => {}
        }
    }

    let mut transfers = Vec::with_capacity(debtors.len().max(creditors.len()));

    loop {
        let Some((debtor_handle, &debtor, owed)) = debtors.peek_max() else {
            break;
        };
        let Some((creditor_handle, &creditor, due)) = creditors.peek_max() else {
            break;
        };

        let amount = owed.min(due);
        transfers.push(SettlementTransfer {
            room_id,
            source: debtor,
            destination: creditor,
            amount,
        });

        if owed == amount {
            debtors.extract_max()?;
        } else {
            debtors.update(debtor_handle, owed - amount)?;
        }

        if due == amount {
            creditors.extract_max()?;
        } else {
            creditors.update(creditor_handle, due - amount)?;
        }
    }

    // Balanced input always drains both sides together
    if !debtors.is_empty() || !creditors.is_empty() {
        return Err(Error::NettingInvariantViolation {
            debtors: debtors.len(),
            creditors: creditors.len(),
        });
    }

    Ok(transfers)
}
