//! Room subscriptions and their delivery loop

use crate::{message::RoomUpdate, registry::RoomRegistry, Error, Result};
use async_trait::async_trait;
use ledger_core::{ParticipantId, RoomId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Opaque subscription identifier, unique per registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Transport side of a subscription
#[async_trait]
pub trait UpdateSink: Send + Sync {
    /// Send one payload to the client
    async fn send(&self, update: &RoomUpdate) -> Result<()>;
}

/// Sink that forwards server-sent-event frames into a channel
#[derive(Debug, Clone)]
pub struct SseChannelSink {
    frames: mpsc::Sender<String>,
}

impl SseChannelSink {
    /// Create sink writing into `frames`
    pub fn new(frames: mpsc::Sender<String>) -> Self {
        Self { frames }
    }
}

#[async_trait]
impl UpdateSink for SseChannelSink {
    async fn send(&self, update: &RoomUpdate) -> Result<()> {
        let frame = update.to_sse_frame()?;
        self.frames
            .send(frame)
            .await
            .map_err(|_| Error::SinkClosed("SSE receiver dropped".to_string()))
    }
}

/// Live endpoint of one participant in one room
///
/// Closing, dropping, or finishing [`run`](Self::run) deregisters it from the
/// registry. Closing twice is a no-op.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    room_id: RoomId,
    participant: ParticipantId,
    receiver: mpsc::Receiver<Arc<RoomUpdate>>,
    registry: Weak<RoomRegistry>,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        room_id: RoomId,
        participant: ParticipantId,
        receiver: mpsc::Receiver<Arc<RoomUpdate>>,
        registry: Weak<RoomRegistry>,
    ) -> Self {
        Self {
            id,
            room_id,
            participant,
            receiver,
            registry,
            closed: false,
        }
    }

    /// Subscription ID
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Subscribed room
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Owning participant
    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// True once closed locally
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for the next update; `None` once the registry dropped this endpoint
    pub async fn recv(&mut self) -> Option<Arc<RoomUpdate>> {
        self.receiver.recv().await
    }

    /// Next queued update without waiting
    pub fn try_recv(&mut self) -> Option<Arc<RoomUpdate>> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving and deregister
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.receiver.close();

        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.room_id, self.id);
        }
    }

    /// Forward updates to `sink` until cancelled, dropped by the registry, or
    /// the sink fails
    pub async fn run<S>(mut self, sink: &S, cancel: CancellationToken) -> Result<()>
    where
        S: UpdateSink + ?Sized,
    {
        info!(subscription = %self.id, room_id = %self.room_id, "Delivery loop started");

        let result = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(subscription = %self.id, "Delivery loop cancelled");
                    break Ok(());
                }

                update = self.receiver.recv() => match update {
                    Some(update) => {
                        // A stalled client must not outlive cancellation
                        tokio::select! {
                            biased;

                            _ = cancel.cancelled() => {
                                debug!(subscription = %self.id, "Delivery loop cancelled mid-send");
                                break Ok(());
                            }

                            sent = sink.send(&update) => {
                                if let Err(e) = sent {
                                    warn!(subscription = %self.id, error = %e, "Sink failed");
                                    break Err(e);
                                }
                            }
                        }
                    }
                    None => {
                        debug!(subscription = %self.id, "Dropped by registry");
                        break Ok(());
                    }
                },
            }
        };

        self.close();
        info!(subscription = %self.id, room_id = %self.room_id, "Delivery loop stopped");

        result
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
