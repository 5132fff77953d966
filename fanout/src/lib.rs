//! Room update fan-out
//!
//! Pushes settlement and ledger changes to every live subscriber of a room:
//! - One bounded queue per subscriber, filled with non-blocking sends
//! - Saturated or disconnected subscribers are dropped, never waited on
//! - The participant who caused an update does not receive it
//! - Delivery loops stop on cancellation and deregister themselves
//! - Observability via Prometheus metrics

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod subscriber;

pub use config::SubscriberConfig;
pub use error::{DeliveryFailure, Error, Result};
pub use message::RoomUpdate;
pub use registry::{BroadcastReport, RoomRegistry};
pub use subscriber::{SseChannelSink, Subscription, SubscriptionId, UpdateSink};
