//! Inbound Ports (Driving Ports / API)

use crate::domain::value_objects::{
    AdmissionStats, PushOutcome, ReleaseSummary, SnapshotDecision,
};
use crate::lock::OwnerToken;
use crate::ports::outbound::AccountDb;
use shared_types::{AckCursor, BlockHeight, Hash, SequencePosition, SequencedTransaction};
use std::sync::Arc;

/// Ordered admission of gateway transactions.
///
/// Every call names the logical actor making it. Nested calls by the same
/// actor re-enter the admission lock; calls by different actors serialize.
pub trait TransactionAdmissionApi: Send + Sync {
    /// Buffer a transaction and dispatch everything it makes releasable.
    ///
    /// Positions at or below the watermark are dropped as stale. Position 0
    /// is dispatched on its own turn without moving the watermark.
    fn push(&self, owner: OwnerToken, tx: SequencedTransaction) -> PushOutcome;

    /// Raise the watermark to `value` and release what that unblocks.
    /// Values below the current watermark are ignored.
    fn set_threshold(&self, owner: OwnerToken, value: SequencePosition) -> ReleaseSummary;

    /// Current watermark, read under the admission lock.
    fn get_threshold(&self, owner: OwnerToken) -> SequencePosition;

    /// Latest published resumption cursor. Lock-free.
    fn ack_cursor(&self) -> AckCursor;

    /// Counters and sizes, read under the admission lock.
    fn stats(&self, owner: OwnerToken) -> AdmissionStats;
}

/// Snapshot handoff between block commit and the rest of the node.
pub trait StateSnapshotApi: Send + Sync {
    /// Offer the post-state of a committed block.
    ///
    /// Always records `height`. Adopts `snapshot` and forwards `baseline` to
    /// the watermark only when no snapshot exists yet or `baseline` is at or
    /// beyond the current watermark; otherwise neither the snapshot nor the
    /// watermark changes.
    fn set_latest_state_db(
        &self,
        owner: OwnerToken,
        snapshot: Arc<dyn AccountDb>,
        baseline: SequencePosition,
        height: BlockHeight,
    ) -> SnapshotDecision;

    /// The current authoritative snapshot.
    fn get_latest_state_db(&self, owner: OwnerToken) -> Option<Arc<dyn AccountDb>>;

    /// A prior snapshot by state root.
    fn get_account_db_by_hash(&self, root: &Hash) -> Option<Arc<dyn AccountDb>>;

    /// Latest height reported by block commit.
    fn latest_height(&self, owner: OwnerToken) -> Option<BlockHeight>;
}
