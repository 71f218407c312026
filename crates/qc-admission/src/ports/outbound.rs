//! Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the pipeline calls but does not implement: the application
//! that consumes admitted transactions, the state database, and the metrics
//! backend.

use crate::domain::value_objects::ReleaseSummary;
use shared_types::{BlockHeight, Hash, SequencePosition, SequencedTransaction};
use std::fmt;
use std::sync::Arc;

pub use crate::lock::latency::{LockLatencyObserver, NoopLockObserver};

/// Consumer of admitted transactions.
///
/// Invoked synchronously inside the locked release phase, once per released
/// item, in release order. Implementations must not block and must not call
/// back into the pipeline.
pub trait ApplicationHandler: Send + Sync {
    fn on_admitted(&self, tx: SequencedTransaction);
}

impl<F> ApplicationHandler for F
where
    F: Fn(SequencedTransaction) + Send + Sync,
{
    fn on_admitted(&self, tx: SequencedTransaction) {
        self(tx)
    }
}

/// Handle to the account/state database at one block height.
pub trait AccountDb: Send + Sync + fmt::Debug {
    /// Root hash identifying this snapshot.
    fn state_root(&self) -> Hash;

    /// Height of the block whose post-state this is.
    fn height(&self) -> BlockHeight;
}

/// Historical snapshots, looked up by state root.
pub trait StateHistory: Send + Sync {
    fn account_db_by_hash(&self, root: &Hash) -> Option<Arc<dyn AccountDb>>;
}

/// History that retains nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStateHistory;

impl StateHistory for NoStateHistory {
    fn account_db_by_hash(&self, _root: &Hash) -> Option<Arc<dyn AccountDb>> {
        None
    }
}

/// Metrics sink for admission activity.
///
/// Implementations are called after the core's inner state mutex is
/// released but while the caller still holds the owner lock, so they must
/// not block.
pub trait AdmissionMetrics: Send + Sync {
    fn record_release(&self, summary: &ReleaseSummary);
    fn record_stale(&self);
    fn record_duplicate(&self);
    fn set_watermark(&self, watermark: SequencePosition);
    fn set_buffered(&self, buffered: usize);
    fn set_ingress_depth(&self, depth: usize);
    fn record_snapshot(&self, adopted: bool, height: BlockHeight);
}

/// Metrics sink that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAdmissionMetrics;

impl AdmissionMetrics for NoopAdmissionMetrics {
    fn record_release(&self, _summary: &ReleaseSummary) {}
    fn record_stale(&self) {}
    fn record_duplicate(&self) {}
    fn set_watermark(&self, _watermark: SequencePosition) {}
    fn set_buffered(&self, _buffered: usize) {}
    fn set_ingress_depth(&self, _depth: usize) {}
    fn record_snapshot(&self, _adopted: bool, _height: BlockHeight) {}
}
