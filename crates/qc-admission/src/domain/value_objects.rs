//! Value objects for the Admission Pipeline

use serde::{Deserialize, Serialize};
use shared_types::{BlockHeight, SequencePosition};

/// What one release pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    /// Ordered items dispatched (each advanced the watermark by one)
    pub admitted: u64,
    /// Wildcard items dispatched
    pub wildcard: u64,
    /// Buffered items dropped because the watermark overtook them
    pub stale_discarded: u64,
}

impl ReleaseSummary {
    /// Items handed to the application handler.
    pub fn dispatched(&self) -> u64 {
        self.admitted + self.wildcard
    }

    pub fn merge(&mut self, other: ReleaseSummary) {
        self.admitted += other.admitted;
        self.wildcard += other.wildcard;
        self.stale_discarded += other.stale_discarded;
    }
}

/// Result of pushing one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// Position already at or below the watermark; dropped.
    Stale,
    /// Same position already buffered; dropped.
    Duplicate,
    /// Buffered, followed by a release pass.
    Accepted(ReleaseSummary),
}

impl PushOutcome {
    pub fn summary(&self) -> ReleaseSummary {
        match self {
            Self::Accepted(summary) => *summary,
            Self::Stale | Self::Duplicate => ReleaseSummary::default(),
        }
    }
}

/// Lifetime counters plus current sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionStats {
    pub watermark: SequencePosition,
    pub buffered: usize,
    pub admitted: u64,
    pub wildcard_admitted: u64,
    pub stale_discarded: u64,
    pub duplicate_discarded: u64,
}

/// Outcome of `set_latest_state_db`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// Candidate became the current snapshot.
    Adopted {
        height: BlockHeight,
        baseline: SequencePosition,
    },
    /// Candidate baseline is behind the watermark, or its height does not
    /// advance past the current snapshot. Nothing changed except the
    /// recorded height.
    Ignored {
        baseline: SequencePosition,
        watermark: SequencePosition,
    },
}

impl SnapshotDecision {
    pub fn is_adopted(&self) -> bool {
        matches!(self, Self::Adopted { .. })
    }
}
