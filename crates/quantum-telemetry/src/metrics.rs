//! Prometheus metrics for the node.
//!
//! All metrics follow the naming convention: `qc_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., admitted_total)
//! - **Gauge**: Value that can go up or down (e.g., watermark)
//! - **Histogram**: Distribution of values (e.g., lock_wait_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// Transactions released to the application
    pub static ref ADMITTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("qc_admission_admitted_total", "Transactions released to the application"),
        &["kind"]  // kind: ordered/wildcard
    ).expect("metric creation failed");

    /// Transactions dropped without release
    pub static ref DISCARDED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("qc_admission_discarded_total", "Transactions dropped without release"),
        &["reason"]  // reason: stale/duplicate/overtaken
    ).expect("metric creation failed");

    /// Highest contiguously released position
    pub static ref WATERMARK: Gauge = Gauge::new(
        "qc_admission_watermark",
        "Highest contiguously released sequence position"
    ).expect("metric creation failed");

    /// Transactions buffered waiting for a gap to fill
    pub static ref BUFFERED: Gauge = Gauge::new(
        "qc_admission_buffered",
        "Transactions buffered in the reordering heap"
    ).expect("metric creation failed");

    /// Ingress queue depth
    pub static ref INGRESS_DEPTH: Gauge = Gauge::new(
        "qc_admission_ingress_depth",
        "Transactions queued between the gateway and the admission worker"
    ).expect("metric creation failed");

    /// Time spent waiting to acquire an owner lock
    pub static ref LOCK_WAIT: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "qc_admission_lock_wait_seconds",
            "Time spent waiting for an owner lock"
        ).buckets(exponential_buckets(0.000_001, 4.0, 12).expect("valid buckets")),
        &["lock"]
    ).expect("metric creation failed");

    /// Time an owner lock was held per acquisition
    pub static ref LOCK_HOLD: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "qc_admission_lock_hold_seconds",
            "Time an owner lock was held"
        ).buckets(exponential_buckets(0.000_001, 4.0, 12).expect("valid buckets")),
        &["lock"]
    ).expect("metric creation failed");

    // =========================================================================
    // BLOCK COMMIT / SNAPSHOTS
    // =========================================================================

    /// State snapshots offered to admission
    pub static ref SNAPSHOTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("qc_snapshot_offers_total", "State snapshots offered to admission"),
        &["decision"]  // decision: adopted/ignored
    ).expect("metric creation failed");

    /// Latest committed height seen
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "qc_snapshot_chain_height",
        "Latest committed block height"
    ).expect("metric creation failed");

    /// Block-commit handoff duration
    pub static ref SNAPSHOT_HANDOFF_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "qc_snapshot_handoff_duration_seconds",
            "Time to hand a committed block's state to admission"
        ).buckets(exponential_buckets(0.000_01, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // GATEWAY
    // =========================================================================

    /// Acknowledgements sent to the gateway
    pub static ref GATEWAY_ACKS: Counter = Counter::new(
        "qc_gateway_acks_sent_total",
        "Resumption cursors sent to the gateway"
    ).expect("metric creation failed");

    /// Replay requests sent after a reconnect
    pub static ref GATEWAY_REPLAYS: Counter = Counter::new(
        "qc_gateway_replay_requests_total",
        "Replay requests sent to the gateway"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS
    // =========================================================================

    /// Events emitted on the node bus, by kind
    pub static ref EVENT_BUS_MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("qc_eventbus_messages_sent_total", "Events emitted on the node bus"),
        &["event_type"]
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Component errors by type
    pub static ref COMPONENT_ERRORS: CounterVec = CounterVec::new(
        Opts::new("qc_component_errors_total", "Errors by component and type"),
        &["component", "error_type"]
    ).expect("metric creation failed");
}

/// Handle to the registry the metrics were registered with.
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Admission
        Box::new(ADMITTED_TOTAL.clone()),
        Box::new(DISCARDED_TOTAL.clone()),
        Box::new(WATERMARK.clone()),
        Box::new(BUFFERED.clone()),
        Box::new(INGRESS_DEPTH.clone()),
        Box::new(LOCK_WAIT.clone()),
        Box::new(LOCK_HOLD.clone()),
        // Snapshots
        Box::new(SNAPSHOTS_TOTAL.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(SNAPSHOT_HANDOFF_DURATION.clone()),
        // Gateway
        Box::new(GATEWAY_ACKS.clone()),
        Box::new(GATEWAY_REPLAYS.clone()),
        // Event Bus
        Box::new(EVENT_BUS_MESSAGES_SENT.clone()),
        // Errors
        Box::new(COMPONENT_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::HistogramTimer::new(&$histogram)
    };
}
