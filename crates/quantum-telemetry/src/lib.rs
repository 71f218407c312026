//! # Quantum Telemetry
//!
//! Observability for the admission node: structured logs through
//! `tracing-subscriber`, optional span export to Tempo, and a Prometheus
//! registry covering admission, snapshot handoff, gateway and event bus
//! activity.
//!
//! ```rust,ignore
//! let guard = quantum_telemetry::init_telemetry(TelemetryConfig::from_env()).await?;
//! // ... run the node ...
//! tracing::debug!(metrics = %guard.metrics_snapshot()?, "Final metrics");
//! ```
//!
//! Configuration is read from `OTEL_*` and `QC_*` variables; see
//! [`TelemetryConfig::from_env`].

mod config;
mod logging;
mod metrics;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, ADMITTED_TOTAL, BUFFERED,
    CHAIN_HEIGHT, COMPONENT_ERRORS, DISCARDED_TOTAL, EVENT_BUS_MESSAGES_SENT, GATEWAY_ACKS,
    GATEWAY_REPLAYS, INGRESS_DEPTH, LOCK_HOLD, LOCK_WAIT, REGISTRY, SNAPSHOTS_TOTAL,
    SNAPSHOT_HANDOFF_DURATION, WATERMARK,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global subscriber.
///
/// Hold the returned guard until exit. Dropping it flushes exported spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let tracing = tracing_setup::init_tracing(&config).await?;

    Ok(TelemetryGuard {
        service: config.full_service_name(),
        tracing,
        metrics,
    })
}

pub struct TelemetryGuard {
    service: String,
    tracing: TracingGuard,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Current values of every registered metric, Prometheus text format.
    pub fn metrics_snapshot(&self) -> Result<String, TelemetryError> {
        encode_metrics()
    }

    pub fn exporting_spans(&self) -> bool {
        self.tracing.exporting()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service, "Shutting down telemetry");
    }
}

/// `info_span!` tagged for one node component.
///
/// ```rust,ignore
/// let span = component_span!("snapshot_handoff", component = "block-commit", height);
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}
