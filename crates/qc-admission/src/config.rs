//! Configuration for the Admission Pipeline

use crate::domain::errors::AdmissionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of in-flight items the ingress queue holds before the
/// network-receive path blocks.
pub const DEFAULT_INGRESS_CAPACITY: usize = 100_000;

/// Admission configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Bounded ingress queue capacity
    pub ingress_capacity: usize,
    /// Lock waits or holds longer than this are logged at warn level
    pub slow_lock_threshold_ms: u64,
    /// OS thread name for the admission worker
    pub worker_thread_name: String,
}

impl AdmissionConfig {
    pub fn slow_lock_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_lock_threshold_ms)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.ingress_capacity == 0 {
            return Err(AdmissionError::InvalidConfig(
                "ingress_capacity must be greater than zero".to_string(),
            ));
        }
        if self.worker_thread_name.is_empty() {
            return Err(AdmissionError::InvalidConfig(
                "worker_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            ingress_capacity: DEFAULT_INGRESS_CAPACITY,
            slow_lock_threshold_ms: 100,
            worker_thread_name: "admission-worker".to_string(),
        }
    }
}
