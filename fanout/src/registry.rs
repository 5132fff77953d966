//! Room subscription registry
//!
//! Maps each room to its open subscriptions. Rooms are created on first
//! subscribe and pruned when their last subscription leaves.
//!
//! Broadcast never blocks: each subscriber has a bounded queue and a payload
//! that does not fit is a delivery failure for that subscriber only. Failed
//! subscribers are collected while iterating and removed afterwards.

use crate::{
    config::SubscriberConfig,
    error::{DeliveryFailure, Error},
    message::RoomUpdate,
    metrics::{FANOUT_BROADCAST_DURATION, FANOUT_DELIVERIES_TOTAL, FANOUT_SUBSCRIPTIONS_ACTIVE},
    subscriber::{Subscription, SubscriptionId},
    Result,
};
use dashmap::DashMap;
use ledger_core::{ParticipantId, RoomId};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Endpoint {
    participant: ParticipantId,
    sender: mpsc::Sender<Arc<RoomUpdate>>,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that received the payload
    pub delivered: usize,
    /// Subscriptions owned by the originator, not sent to
    pub skipped: usize,
    /// Subscriptions removed because delivery failed
    pub dropped: Vec<SubscriptionId>,
}

/// Process-wide room -> subscriptions map
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, HashMap<SubscriptionId, Endpoint>>,
    next_id: AtomicU64,
    config: SubscriberConfig,
}

impl RoomRegistry {
    /// Create registry
    pub fn new(config: SubscriberConfig) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            rooms: DashMap::new(),
            next_id: AtomicU64::new(1),
            config,
        }))
    }

    /// Open a subscription for `participant` in `room_id`
    pub fn subscribe(self: &Arc<Self>, room_id: RoomId, participant: ParticipantId) -> Subscription {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity);

        self.rooms
            .entry(room_id)
            .or_default()
            .insert(id, Endpoint { participant, sender });
        FANOUT_SUBSCRIPTIONS_ACTIVE.inc();

        info!(subscription = %id, room_id = %room_id, participant = %participant, "Subscription opened");

        Subscription::new(id, room_id, participant, receiver, Arc::downgrade(self))
    }

    /// Remove a subscription; returns `false` if it was already gone
    pub fn unsubscribe(&self, room_id: RoomId, subscription_id: SubscriptionId) -> bool {
        let removed = match self.rooms.get_mut(&room_id) {
            Some(mut subscriptions) => subscriptions.remove(&subscription_id).is_some(),
            None => false,
        };

        if removed {
            FANOUT_SUBSCRIPTIONS_ACTIVE.dec();
            self.rooms.remove_if(&room_id, |_, subscriptions| subscriptions.is_empty());
            info!(subscription = %subscription_id, room_id = %room_id, "Subscription closed");
        }

        removed
    }

    /// Push `update` to every subscriber of the room except the originator's
    pub fn broadcast(
        &self,
        room_id: RoomId,
        originator: ParticipantId,
        update: RoomUpdate,
    ) -> BroadcastReport {
        let timer = FANOUT_BROADCAST_DURATION.start_timer();
        let payload = Arc::new(update);
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        if let Some(subscriptions) = self.rooms.get(&room_id) {
            for (id, endpoint) in subscriptions.iter() {
                if endpoint.participant == originator {
                    report.skipped += 1;
                    continue;
                }

                match endpoint.sender.try_send(Arc::clone(&payload)) {
                    Ok(()) => {
                        report.delivered += 1;
                        FANOUT_DELIVERIES_TOTAL.with_label_values(&["delivered"]).inc();
                    }
                    Err(e) => {
                        let reason = match e {
                            TrySendError::Full(_) => DeliveryFailure::Saturated,
                            TrySendError::Closed(_) => DeliveryFailure::Disconnected,
                        };
                        let error = Error::DeliveryFailed {
                            subscription_id: *id,
                            reason,
                        };
                        warn!(room_id = %room_id, error = %error, "Dropping subscriber");
                        FANOUT_DELIVERIES_TOTAL
                            .with_label_values(&[reason.as_str()])
                            .inc();
                        failed.push(*id);
                    }
                }
            }
        }

        for id in &failed {
            self.unsubscribe(room_id, *id);
        }
        report.dropped = failed;

        timer.observe_duration();
        debug!(
            room_id = %room_id,
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped.len(),
            "Broadcast complete"
        );

        report
    }

    /// Close every subscription
    pub fn shutdown(&self) {
        let mut closed = 0usize;
        self.rooms.retain(|_, subscriptions| {
            closed += subscriptions.len();
            false
        });
        FANOUT_SUBSCRIPTIONS_ACTIVE.sub(closed as i64);

        info!(closed, "Room registry shut down");
    }

    /// Open subscriptions in a room
    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.rooms.get(&room_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Rooms with at least one subscription
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// True if the subscription is registered
    pub fn contains(&self, room_id: RoomId, subscription_id: SubscriptionId) -> bool {
        self.rooms
            .get(&room_id)
            .map(|s| s.contains_key(&subscription_id))
            .unwrap_or(false)
    }
}
