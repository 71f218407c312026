//! # Component Container
//!
//! Builds the admission core and the infrastructure around it.
//!
//! ## Wiring
//!
//! ```text
//! InMemoryStateHistory ──StateHistory──→ AdmissionCore ──ApplicationHandler──→ BusAdmissionHandler
//! PrometheusAdmissionMetrics ──metrics──↗      │                                   │
//! PrometheusLockObserver ──lock latency──↗     │                                   ├─→ Event Bus
//!                                              └──ack cursor (watch)               └─→ application
//! ```

use std::sync::Arc;

use qc_admission::{AdmissionCore, ApplicationHandler};
use quantum_telemetry::{metric_inc, EVENT_BUS_MESSAGES_SENT};
use shared_bus::InMemoryEventBus;
use tracing::{info, instrument};

use crate::adapters::{
    BusAdmissionHandler, InMemoryStateHistory, PrometheusAdmissionMetrics, PrometheusLockObserver,
};
use crate::container::config::NodeConfig;

/// Shared components of a running node.
pub struct NodeContainer {
    /// Event bus shared by every handler.
    pub event_bus: Arc<InMemoryEventBus>,

    /// Retained committed states, by height and root.
    pub state_history: Arc<InMemoryStateHistory>,

    /// Ordered admission and the state snapshot registry.
    pub admission: Arc<AdmissionCore>,

    /// Prometheus-backed admission metrics, also handed to the worker.
    pub metrics: Arc<PrometheusAdmissionMetrics>,

    pub config: NodeConfig,
}

impl NodeContainer {
    /// Wire the components. Admitted transactions are announced on the bus
    /// and then handed to `application`.
    #[instrument(name = "container_init", skip_all)]
    pub fn new(config: NodeConfig, application: Arc<dyn ApplicationHandler>) -> Self {
        info!(network = %config.gateway.network, "Initializing node container");

        let event_bus = Arc::new(
            InMemoryEventBus::with_capacity(config.gateway.event_bus_capacity)
                .with_observer(Arc::new(|kind, _receivers| {
                    metric_inc!(EVENT_BUS_MESSAGES_SENT, &[kind]);
                })),
        );
        let state_history = Arc::new(InMemoryStateHistory::new(
            config.state_history.retained_snapshots,
        ));
        let metrics = Arc::new(PrometheusAdmissionMetrics);

        let handler = Arc::new(BusAdmissionHandler::new(
            Arc::clone(&event_bus),
            application,
        ));
        let admission = Arc::new(
            AdmissionCore::builder(handler)
                .with_config(config.admission.clone())
                .with_history(state_history.clone())
                .with_metrics(metrics.clone())
                .with_lock_observer(Arc::new(PrometheusLockObserver))
                .build(),
        );

        info!(
            ingress_capacity = config.admission.ingress_capacity,
            retained_snapshots = state_history.retained(),
            event_bus_capacity = event_bus.capacity(),
            "Node container initialized"
        );

        Self {
            event_bus,
            state_history,
            admission,
            metrics,
            config,
        }
    }

    pub fn event_bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn admission(&self) -> Arc<AdmissionCore> {
        Arc::clone(&self.admission)
    }
}
