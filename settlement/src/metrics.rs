//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `settlement_recomputes_total` - Successful room recomputations
//! - `settlement_recompute_failures_total` - Failed room recomputations
//! - `settlement_recompute_duration_seconds` - Histogram of recompute latencies
//! - `settlement_transfers` - Histogram of transfers per snapshot

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Metrics live in a private registry so several orchestrators can coexist
/// in one process.
#[derive(Clone)]
pub struct SettlementMetrics {
    /// Successful recomputations
    pub recomputes_total: IntCounter,

    /// Failed recomputations
    pub recompute_failures_total: IntCounter,

    /// Recompute duration histogram
    pub recompute_duration: Histogram,

    /// Transfers per snapshot histogram
    pub transfers: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for SettlementMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementMetrics")
            .field("recomputes_total", &self.recomputes_total.get())
            .field("recompute_failures_total", &self.recompute_failures_total.get())
            .finish_non_exhaustive()
    }
}

impl SettlementMetrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let recomputes_total = IntCounter::new(
            "settlement_recomputes_total",
            "Total number of successful room recomputations",
        )?;
        registry.register(Box::new(recomputes_total.clone()))?;

        let recompute_failures_total = IntCounter::new(
            "settlement_recompute_failures_total",
            "Total number of failed room recomputations",
        )?;
        registry.register(Box::new(recompute_failures_total.clone()))?;

        let recompute_duration = Histogram::with_opts(
            HistogramOpts::new(
                "settlement_recompute_duration_seconds",
                "Histogram of recompute latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
        )?;
        registry.register(Box::new(recompute_duration.clone()))?;

        let transfers = Histogram::with_opts(
            HistogramOpts::new("settlement_transfers", "Histogram of transfers per snapshot")
                .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(transfers.clone()))?;

        Ok(Self {
            recomputes_total,
            recompute_failures_total,
            recompute_duration,
            transfers,
            registry,
        })
    }

    /// Record a successful recompute
    pub fn record_recompute(&self, transfer_count: usize, duration_seconds: f64) {
        self.recomputes_total.inc();
        self.transfers.observe(transfer_count as f64);
        self.recompute_duration.observe(duration_seconds);
    }

    /// Record a failed recompute
    pub fn record_failure(&self, duration_seconds: f64) {
        self.recompute_failures_total.inc();
        self.recompute_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
