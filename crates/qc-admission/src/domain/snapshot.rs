//! # State Snapshot Slot
//!
//! Holds the single current authoritative state snapshot, the height it was
//! adopted at, and the latest height any block commit reported.
//!
//! A candidate is adopted when no snapshot exists yet, or when its height
//! is above the current snapshot's and its block baseline is at or beyond
//! the watermark. Anything else would hand execution a state that predates
//! the current one or transactions already admitted.
//!
//! Generic over the snapshot handle so the rule is testable without a
//! state database.

use super::value_objects::SnapshotDecision;
use shared_types::{BlockHeight, SequencePosition};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SnapshotSlot<S> {
    current: Option<S>,
    snapshot_height: Option<BlockHeight>,
    baseline: SequencePosition,
    latest_height: Option<BlockHeight>,
}

impl<S> Default for SnapshotSlot<S> {
    fn default() -> Self {
        Self {
            current: None,
            snapshot_height: None,
            baseline: 0,
            latest_height: None,
        }
    }
}

impl<S: Clone> SnapshotSlot<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<S> {
        self.current.clone()
    }

    /// Height of the adopted snapshot.
    pub fn snapshot_height(&self) -> Option<BlockHeight> {
        self.snapshot_height
    }

    /// Baseline sequence of the adopted snapshot.
    pub fn baseline(&self) -> SequencePosition {
        self.baseline
    }

    /// Latest height reported by any commit, adopted or not.
    pub fn latest_height(&self) -> Option<BlockHeight> {
        self.latest_height
    }

    /// Record `height` and decide whether the candidate may replace the
    /// current snapshot given the present `watermark`.
    pub fn offer(
        &mut self,
        candidate: S,
        baseline: SequencePosition,
        height: BlockHeight,
        watermark: SequencePosition,
    ) -> SnapshotDecision {
        self.latest_height = Some(height);

        if self.current.is_some() && baseline < watermark {
            return SnapshotDecision::Ignored {
                baseline,
                watermark,
            };
        }

        if let Some(previous) = self.snapshot_height {
            if height <= previous {
                debug!(
                    previous_height = previous,
                    height, "Ignoring snapshot at non-increasing height"
                );
                return SnapshotDecision::Ignored {
                    baseline,
                    watermark,
                };
            }
        }

        self.current = Some(candidate);
        self.snapshot_height = Some(height);
        self.baseline = baseline;
        SnapshotDecision::Adopted { height, baseline }
    }
}
