//! # Prometheus Adapters
//!
//! Implement the admission pipeline's metrics and lock-latency ports over
//! the shared Prometheus registry.

use qc_admission::{AdmissionMetrics, LockLatencyObserver, ReleaseSummary};
use quantum_telemetry::{
    metric_inc, metric_observe, ADMITTED_TOTAL, BUFFERED, CHAIN_HEIGHT, DISCARDED_TOTAL,
    INGRESS_DEPTH, LOCK_HOLD, LOCK_WAIT, SNAPSHOTS_TOTAL, WATERMARK,
};
use shared_types::{BlockHeight, SequencePosition};
use std::time::Duration;

/// Admission metrics backed by the global Prometheus registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusAdmissionMetrics;

impl AdmissionMetrics for PrometheusAdmissionMetrics {
    fn record_release(&self, summary: &ReleaseSummary) {
        if summary.admitted > 0 {
            ADMITTED_TOTAL
                .with_label_values(&["ordered"])
                .inc_by(summary.admitted as f64);
        }
        if summary.wildcard > 0 {
            ADMITTED_TOTAL
                .with_label_values(&["wildcard"])
                .inc_by(summary.wildcard as f64);
        }
        if summary.stale_discarded > 0 {
            DISCARDED_TOTAL
                .with_label_values(&["overtaken"])
                .inc_by(summary.stale_discarded as f64);
        }
    }

    fn record_stale(&self) {
        metric_inc!(DISCARDED_TOTAL, &["stale"]);
    }

    fn record_duplicate(&self) {
        metric_inc!(DISCARDED_TOTAL, &["duplicate"]);
    }

    fn set_watermark(&self, watermark: SequencePosition) {
        WATERMARK.set(watermark as f64);
    }

    fn set_buffered(&self, buffered: usize) {
        BUFFERED.set(buffered as f64);
    }

    fn set_ingress_depth(&self, depth: usize) {
        INGRESS_DEPTH.set(depth as f64);
    }

    fn record_snapshot(&self, adopted: bool, height: BlockHeight) {
        let decision = if adopted { "adopted" } else { "ignored" };
        metric_inc!(SNAPSHOTS_TOTAL, &[decision]);
        CHAIN_HEIGHT.set(height as f64);
    }
}

/// Lock wait and hold histograms, labelled by lock name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusLockObserver;

impl LockLatencyObserver for PrometheusLockObserver {
    fn observe_wait(&self, lock: &'static str, waited: Duration) {
        metric_observe!(LOCK_WAIT, &[lock], waited.as_secs_f64());
    }

    fn observe_hold(&self, lock: &'static str, held: Duration) {
        metric_observe!(LOCK_HOLD, &[lock], held.as_secs_f64());
    }
}
