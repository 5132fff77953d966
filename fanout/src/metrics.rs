//! Prometheus metrics for room fan-out

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};

lazy_static! {
    /// Per-subscriber delivery outcomes
    pub static ref FANOUT_DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fanout_deliveries_total",
        "Room update deliveries by outcome",
        &["status"]
    )
    .unwrap();

    /// Open subscriptions across all rooms
    pub static ref FANOUT_SUBSCRIPTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "fanout_subscriptions_active",
        "Open room subscriptions"
    )
    .unwrap();

    /// Broadcast duration
    pub static ref FANOUT_BROADCAST_DURATION: Histogram = register_histogram!(
        "fanout_broadcast_duration_seconds",
        "Room broadcast duration in seconds",
        vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01]
    )
    .unwrap();
}
