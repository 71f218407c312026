//! # Node Configuration
//!
//! Unified configuration for the admission pipeline, telemetry, state
//! history and the gateway connection.
//!
//! Every value has a default and can be overridden from the environment.
//! Unparseable overrides are logged and ignored.

use qc_admission::AdmissionConfig;
use quantum_telemetry::TelemetryConfig;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::env;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Admission pipeline configuration.
    pub admission: AdmissionConfig,
    /// Logging, tracing and metrics.
    pub telemetry: TelemetryConfig,
    /// Retained state snapshots.
    pub state_history: StateHistoryConfig,
    /// Gateway connection.
    pub gateway: GatewayConfig,
}

impl NodeConfig {
    /// Load configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `QC_INGRESS_CAPACITY`: Ingress queue capacity (default: 100000)
    /// - `QC_SLOW_LOCK_MS`: Slow lock warning threshold (default: 100)
    /// - `QC_STATE_HISTORY`: Snapshots retained for lookup by root (default: 128)
    /// - `QC_NETWORK`: Network name (default: testnet)
    /// - `QC_EVENT_BUS_CAPACITY`: Event bus buffer per subscriber (default: 1000)
    /// - Telemetry variables, see `TelemetryConfig::from_env`
    pub fn from_env() -> Self {
        let mut config = Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::default()
        };

        override_from_env("QC_INGRESS_CAPACITY", &mut config.admission.ingress_capacity);
        override_from_env(
            "QC_SLOW_LOCK_MS",
            &mut config.admission.slow_lock_threshold_ms,
        );
        override_from_env(
            "QC_STATE_HISTORY",
            &mut config.state_history.retained_snapshots,
        );
        override_from_env("QC_EVENT_BUS_CAPACITY", &mut config.gateway.event_bus_capacity);
        if let Ok(network) = env::var("QC_NETWORK") {
            config.gateway.network = network;
        }

        config
    }

    /// Reject configurations the node cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission.ingress_capacity == 0 {
            return Err(ConfigError::ZeroIngressCapacity);
        }
        if self.state_history.retained_snapshots == 0 {
            return Err(ConfigError::ZeroSnapshotRetention);
        }
        if self.gateway.event_bus_capacity == 0 {
            return Err(ConfigError::ZeroEventBusCapacity);
        }
        self.admission
            .validate()
            .map_err(|e| ConfigError::Admission(e.to_string()))
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    let Ok(raw) = env::var(key) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *target = value,
        Err(_) => warn!(key, value = %raw, "Ignoring unparseable environment override"),
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Ingress capacity must be greater than zero (QC_INGRESS_CAPACITY)")]
    ZeroIngressCapacity,

    #[error("State history must retain at least one snapshot (QC_STATE_HISTORY)")]
    ZeroSnapshotRetention,

    #[error("Event bus capacity must be greater than zero (QC_EVENT_BUS_CAPACITY)")]
    ZeroEventBusCapacity,

    #[error("{0}")]
    Admission(String),
}

/// State history configuration.
#[derive(Debug, Clone)]
pub struct StateHistoryConfig {
    /// Most recent snapshots kept for lookup by state root.
    pub retained_snapshots: usize,
}

impl Default for StateHistoryConfig {
    fn default() -> Self {
        Self {
            retained_snapshots: 128,
        }
    }
}

/// Gateway connection configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Network name reported to the gateway.
    pub network: String,
    /// Event bus buffer per subscriber.
    pub event_bus_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            network: "testnet".to_string(),
            event_bus_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
