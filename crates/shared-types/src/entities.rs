//! # Core Domain Entities
//!
//! Defines the entities that cross crate boundaries in the node.
//!
//! ## Clusters
//!
//! - **Ingress**: `IngressUnit`, `SequencedTransaction`, `ArrivalMetadata`
//! - **Acknowledgement**: `AckCursor`
//! - **Chain**: `CommittedBlock`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte hash (block hash or state root).
pub type Hash = [u8; 32];

/// Height of a block in the chain.
pub type BlockHeight = u64;

/// Gateway-assigned delivery order number of a transaction.
pub type SequencePosition = u64;

/// Position reserved for unordered delivery. Admitted immediately,
/// never moves the watermark.
pub const WILDCARD_POSITION: SequencePosition = 0;

/// Identity of the client that submitted a transaction through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SubmitterId(pub String);

impl SubmitterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER A: INGRESS
// =============================================================================

/// A transaction exactly as the gateway transport hands it over.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressUnit {
    /// Delivery order number (0 = unordered).
    pub position: SequencePosition,
    /// Opaque encoded transaction.
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
    /// Submitting client.
    pub submitter: SubmitterId,
}

/// Metadata stamped by the node when a unit comes off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArrivalMetadata {
    /// Unix timestamp in milliseconds.
    pub received_at_ms: u64,
    /// Node-local arrival counter, strictly increasing per process.
    pub arrival_seq: u64,
}

/// A transaction travelling through the admission pipeline.
///
/// Created on gateway delivery, destroyed on release (dispatch to the
/// application handler or discard as stale).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedTransaction {
    /// Delivery order number (0 = unordered, always admit).
    pub position: SequencePosition,
    /// Opaque encoded transaction.
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
    /// Submitting client.
    pub submitter: SubmitterId,
    /// Arrival metadata.
    pub arrival: ArrivalMetadata,
}

impl SequencedTransaction {
    pub fn new(position: SequencePosition, payload: Vec<u8>, submitter: SubmitterId) -> Self {
        Self {
            position,
            payload,
            submitter,
            arrival: ArrivalMetadata::default(),
        }
    }

    /// Build from a gateway unit plus the metadata stamped on receipt.
    pub fn from_ingress(unit: IngressUnit, arrival: ArrivalMetadata) -> Self {
        Self {
            position: unit.position,
            payload: unit.payload,
            submitter: unit.submitter,
            arrival,
        }
    }

    pub fn with_arrival(mut self, arrival: ArrivalMetadata) -> Self {
        self.arrival = arrival;
        self
    }

    /// True for position 0.
    pub fn is_wildcard(&self) -> bool {
        self.position == WILDCARD_POSITION
    }
}

// =============================================================================
// CLUSTER B: ACKNOWLEDGEMENT
// =============================================================================

/// Resumption cursor communicated back to the gateway.
///
/// A watermark `W` means every position in `1..=W` has been admitted,
/// so the next expected position is `W + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AckCursor {
    pub watermark: SequencePosition,
}

impl AckCursor {
    pub fn new(watermark: SequencePosition) -> Self {
        Self { watermark }
    }

    /// First position the transport must replay from after a reconnect.
    pub fn next_expected(&self) -> SequencePosition {
        self.watermark.saturating_add(1)
    }
}

// =============================================================================
// CLUSTER C: CHAIN
// =============================================================================

/// Notification that a block was committed locally.
///
/// `baseline_sequence` is the sequence position up to which the block's
/// post-state already accounts for admitted transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommittedBlock {
    pub height: BlockHeight,
    pub block_hash: Hash,
    pub state_root: Hash,
    pub baseline_sequence: SequencePosition,
}
