//! # Adapters
//!
//! Port implementations connecting the admission pipeline to the rest of
//! the node.
//!
//! - `event_bus` - Application handler announcing admissions on the bus
//! - `gateway` - Gateway ingress stamping and the transport port
//! - `state` - In-memory state snapshot history
//! - `telemetry` - Prometheus metrics and lock-latency observers

pub mod event_bus;
pub mod gateway;
pub mod state;
pub mod telemetry;

pub use event_bus::BusAdmissionHandler;
pub use gateway::{GatewayIngressAdapter, GatewayTransport, LoggingGatewayTransport};
pub use state::{CommittedState, InMemoryStateHistory};
pub use telemetry::{PrometheusAdmissionMetrics, PrometheusLockObserver};
