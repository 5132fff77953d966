//! Core types for the room ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode in storage, JSON on the wire)
//! - Exact arithmetic (integer minor units for money)
//! - Time ordering (UUIDv7 for generated entry and group ids)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh, time-ordered identifier
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Raw 16-byte representation (storage key component)
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_newtype!(
    /// Room identifier
    RoomId
);
uuid_newtype!(
    /// Participant (room member) identifier
    ParticipantId
);
uuid_newtype!(
    /// Ledger entry identifier
    EntryId
);
uuid_newtype!(
    /// Identifier shared by entries created together (e.g. a split expense)
    GroupId
);

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Shared cost paid by one participant on behalf of others
    Expense,
    /// Shared income received by one participant on behalf of others
    Income,
    /// Direct payment between two participants
    Transfer,
}

impl EntryKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Expense => "EXPENSE",
            EntryKind::Income => "INCOME",
            EntryKind::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shared room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room ID
    pub room_id: RoomId,

    /// Unique display name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a new room with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            room_id: RoomId::generate(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Recorded money movement inside a room
///
/// Netting moves `amount` of net position from `source` to `destination`:
/// the source's balance goes down and the destination's goes up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID (UUIDv7, sorts by creation time)
    pub entry_id: EntryId,

    /// Room this entry belongs to
    pub room_id: RoomId,

    /// Group shared with sibling entries created in the same operation
    pub group_id: Option<GroupId>,

    /// Participant whose balance decreases
    pub source: ParticipantId,

    /// Participant whose balance increases
    pub destination: ParticipantId,

    /// Positive amount in minor units
    pub amount: i64,

    /// Entry kind
    pub kind: EntryKind,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Source and destination are the same participant (netting no-op)
    pub fn is_self_entry(&self) -> bool {
        self.source == self.destination
    }
}

/// Caller-supplied draft of a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    /// Participant whose balance decreases
    pub source: ParticipantId,

    /// Participant whose balance increases
    pub destination: ParticipantId,

    /// Positive amount in minor units
    pub amount: i64,

    /// Free-text description
    #[serde(default)]
    pub description: String,
}

impl NewEntry {
    /// Create a draft without a description
    pub fn new(source: ParticipantId, destination: ParticipantId, amount: i64) -> Self {
        Self {
            source,
            destination,
            amount,
            description: String::new(),
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate and materialize into a stored entry
    pub fn into_entry(
        self,
        room_id: RoomId,
        group_id: Option<GroupId>,
        kind: EntryKind,
    ) -> crate::Result<LedgerEntry> {
        if self.amount <= 0 {
            return Err(crate::Error::InvalidEntry(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }

        Ok(LedgerEntry {
            entry_id: EntryId::generate(),
            room_id,
            group_id,
            source: self.source,
            destination: self.destination,
            amount: self.amount,
            kind,
            description: self.description,
            created_at: Utc::now(),
        })
    }
}

/// One settle-up payment in a room's reduced debt set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementTransfer {
    /// Room ID
    pub room_id: RoomId,

    /// Payer
    pub source: ParticipantId,

    /// Payee
    pub destination: ParticipantId,

    /// Positive amount in minor units
    pub amount: i64,
}

/// Complete settlement result for a room
///
/// Each recomputation produces a new snapshot that fully supersedes the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSnapshot {
    /// Room ID
    pub room_id: RoomId,

    /// Transfers in the order they were produced
    pub transfers: Vec<SettlementTransfer>,
}

impl SettlementSnapshot {
    /// Snapshot with no outstanding transfers
    pub fn empty(room_id: RoomId) -> Self {
        Self {
            room_id,
            transfers: Vec::new(),
        }
    }

    /// Number of transfers
    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    /// No transfers outstanding
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Sum of all transfer amounts
    pub fn total_amount(&self) -> i64 {
        self.transfers.iter().map(|t| t.amount).sum()
    }
}
