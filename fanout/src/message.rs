//! Room update envelope pushed to subscribers

use chrono::{DateTime, Utc};
use ledger_core::{LedgerEntry, ParticipantId, RoomId, SettlementTransfer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast payload for one room mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdate {
    /// Update ID (UUIDv7 for ordering)
    pub id: Uuid,

    /// Room the update belongs to
    pub room_id: RoomId,

    /// Participant whose action produced the update
    pub actor: ParticipantId,

    /// Entries created by the mutation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<LedgerEntry>,

    /// Entries removed by the mutation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<LedgerEntry>,

    /// Room settlement after the mutation
    pub transfers: Vec<SettlementTransfer>,

    /// Set when the update announces a new member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_joined: Option<ParticipantId>,

    /// Set when the update announces a departed member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_left: Option<ParticipantId>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl RoomUpdate {
    /// Create update carrying the room's fresh settlement
    pub fn new(room_id: RoomId, actor: ParticipantId, transfers: Vec<SettlementTransfer>) -> Self {
        Self {
            id: Uuid::now_v7(),
            room_id,
            actor,
            added: Vec::new(),
            deleted: Vec::new(),
            transfers,
            member_joined: None,
            member_left: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach created entries
    pub fn with_added(mut self, entries: Vec<LedgerEntry>) -> Self {
        self.added = entries;
        self
    }

    /// Attach deleted entries
    pub fn with_deleted(mut self, entries: Vec<LedgerEntry>) -> Self {
        self.deleted = entries;
        self
    }

    /// Announce a member
    pub fn with_member_joined(mut self, participant: ParticipantId) -> Self {
        self.member_joined = Some(participant);
        self
    }

    /// Announce a departure
    pub fn with_member_left(mut self, participant: ParticipantId) -> Self {
        self.member_left = Some(participant);
        self
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as one server-sent-event frame
    pub fn to_sse_frame(&self) -> crate::Result<String> {
        Ok(format!("data: {}\n\n", self.to_json()?))
    }
}
