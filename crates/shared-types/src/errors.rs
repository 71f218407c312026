//! # Error Types
//!
//! Defines error types used across crates.

use thiserror::Error;

/// Errors reported by a gateway transport implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The long-lived gateway connection is down.
    #[error("Gateway disconnected")]
    Disconnected,

    /// The gateway refused a replay request.
    #[error("Replay from position {from} rejected: {reason}")]
    ReplayRejected { from: u64, reason: String },

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Node operational states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Building components and spawning the worker.
    Starting,
    /// Normal operation.
    Running,
    /// Draining ingress and joining workers.
    ShuttingDown,
    /// All workers joined.
    Stopped,
}
