//! Prometheus metrics for proposal sync passes.
//!
//! [`SyncMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Counters and histograms covering sync passes and ledger traffic.
pub struct SyncMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Sync passes started.
    pub passes: IntCounter,
    /// Proposal ids selected as stale.
    pub stale_selected: IntCounter,
    /// Batched ledger reads issued (state, vote and correction batches).
    pub ledger_batches: IntCounter,
    /// Individual ledger reads that failed inside a batch.
    pub call_failures: IntCounter,
    /// Batches that failed or timed out as a whole.
    pub batch_failures: IntCounter,
    /// Ids re-read by the Pending correction.
    pub pending_corrections: IntCounter,
    /// Cache upserts that changed an entry.
    pub cache_upserts: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one pass, in milliseconds.
    pub pass_duration_ms: Histogram,
}

impl SyncMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let passes = register_int_counter_with_registry!(
            Opts::new("govsync_passes_total", "Total sync passes started"),
            registry
        )
        .expect("failed to register passes counter");

        let stale_selected = register_int_counter_with_registry!(
            Opts::new(
                "govsync_stale_selected_total",
                "Total proposal ids selected for a ledger re-read"
            ),
            registry
        )
        .expect("failed to register stale_selected counter");

        let ledger_batches = register_int_counter_with_registry!(
            Opts::new("govsync_ledger_batches_total", "Total batched ledger reads issued"),
            registry
        )
        .expect("failed to register ledger_batches counter");

        let call_failures = register_int_counter_with_registry!(
            Opts::new(
                "govsync_ledger_call_failures_total",
                "Total individual ledger reads that failed"
            ),
            registry
        )
        .expect("failed to register call_failures counter");

        let batch_failures = register_int_counter_with_registry!(
            Opts::new(
                "govsync_ledger_batch_failures_total",
                "Total ledger batches that failed or timed out"
            ),
            registry
        )
        .expect("failed to register batch_failures counter");

        let pending_corrections = register_int_counter_with_registry!(
            Opts::new(
                "govsync_pending_corrections_total",
                "Total ids re-read because they were composed as Pending"
            ),
            registry
        )
        .expect("failed to register pending_corrections counter");

        let cache_upserts = register_int_counter_with_registry!(
            Opts::new(
                "govsync_cache_upserts_total",
                "Total cache upserts that changed an entry"
            ),
            registry
        )
        .expect("failed to register cache_upserts counter");

        // 1 ms → ~16 s.
        let pass_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("govsync_pass_duration_ms", "Sync pass duration in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register pass_duration_ms histogram");

        Self {
            registry,
            passes,
            stale_selected,
            ledger_batches,
            call_failures,
            batch_failures,
            pending_corrections,
            cache_upserts,
            pass_duration_ms,
        }
    }

    /// Render every metric in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}
