//! Error types for the Admission Pipeline
//!
//! Stale input and watermark regressions are not errors; they are dropped
//! and counted. Lock misuse panics. What remains here are the lifecycle and
//! lookup failures callers can act on.

use shared_types::{BlockHeight, Hash};
use thiserror::Error;

/// All errors that can occur in the admission pipeline
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Configuration rejected at construction time
    #[error("Invalid admission config: {0}")]
    InvalidConfig(String),

    /// The admission worker is gone; nothing drains the ingress queue
    #[error("Ingress channel closed")]
    IngressClosed,

    /// The admission worker thread could not be started
    #[error("Failed to spawn admission worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// No snapshot is registered under this state root
    #[error("No state snapshot for root {}", hex_prefix(.0))]
    SnapshotNotFound(Hash),

    /// The block-commit path referenced a height the history no longer holds
    #[error("No state snapshot retained for height {0}")]
    HeightNotRetained(BlockHeight),
}

fn hex_prefix(hash: &Hash) -> String {
    hash.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdmissionError::InvalidConfig("ingress_capacity must be greater than zero".into());
        assert_eq!(
            err.to_string(),
            "Invalid admission config: ingress_capacity must be greater than zero"
        );
    }

    #[test]
    fn test_snapshot_not_found_display() {
        let mut root = [0u8; 32];
        root[0] = 0xab;
        root[1] = 0xcd;
        let err = AdmissionError::SnapshotNotFound(root);
        assert_eq!(err.to_string(), "No state snapshot for root abcd0000");
    }
}
