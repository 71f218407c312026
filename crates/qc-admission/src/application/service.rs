//! Admission Core
//!
//! The process-wide admission state: reordering heap, watermark and current
//! state snapshot, all guarded by one [`ReentrantOwnerLock`]. The admission
//! worker and the block-commit path both go through this object, so a push
//! can never interleave with a threshold or snapshot update.
//!
//! Locking is two-level. The owner lock is the serialization domain and is
//! held for the whole of every public operation, including nested calls by
//! the same actor. The inner mutex only makes the state memory-safe to touch
//! and is never held across a nested call.

use crate::config::AdmissionConfig;
use crate::domain::heap::AdmissionHeap;
use crate::domain::snapshot::SnapshotSlot;
use crate::domain::value_objects::{
    AdmissionStats, PushOutcome, ReleaseSummary, SnapshotDecision,
};
use crate::lock::{OwnerGuard, OwnerToken, ReentrantOwnerLock};
use crate::ports::inbound::{StateSnapshotApi, TransactionAdmissionApi};
use crate::ports::outbound::{
    AccountDb, AdmissionMetrics, ApplicationHandler, LockLatencyObserver, NoStateHistory,
    NoopAdmissionMetrics, NoopLockObserver, StateHistory,
};
use parking_lot::Mutex;
use shared_types::{AckCursor, BlockHeight, Hash, SequencePosition, SequencedTransaction};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Name reported by lock latency instrumentation.
pub const ADMISSION_LOCK: &str = "admission";

struct CoreState {
    heap: AdmissionHeap,
    snapshot: SnapshotSlot<Arc<dyn AccountDb>>,
}

/// Shared admission state. Construct once per node with
/// [`AdmissionCore::builder`] and pass by `Arc`.
pub struct AdmissionCore {
    lock: ReentrantOwnerLock,
    state: Mutex<CoreState>,
    handler: Arc<dyn ApplicationHandler>,
    history: Arc<dyn StateHistory>,
    metrics: Arc<dyn AdmissionMetrics>,
    acks: watch::Sender<AckCursor>,
}

impl AdmissionCore {
    pub fn builder(handler: Arc<dyn ApplicationHandler>) -> AdmissionCoreBuilder {
        AdmissionCoreBuilder::new(handler)
    }

    /// Hold the admission lock across several calls by the same actor.
    pub fn hold(&self, owner: OwnerToken) -> OwnerGuard<'_> {
        self.lock.hold(owner)
    }

    /// Receiver for resumption cursors. Sees every watermark advance.
    pub fn subscribe_acks(&self) -> watch::Receiver<AckCursor> {
        self.acks.subscribe()
    }

    /// Publish the cursor and gauges after a mutation. Caller holds the
    /// owner lock, so cursors are published in watermark order.
    fn publish(&self, watermark: SequencePosition, buffered: usize) {
        self.acks.send_if_modified(|cursor| {
            if watermark > cursor.watermark {
                cursor.watermark = watermark;
                true
            } else {
                false
            }
        });
        self.metrics.set_watermark(watermark);
        self.metrics.set_buffered(buffered);
    }
}

impl TransactionAdmissionApi for AdmissionCore {
    fn push(&self, owner: OwnerToken, tx: SequencedTransaction) -> PushOutcome {
        let _hold = self.lock.hold(owner);

        let (outcome, watermark, buffered) = {
            let mut state = self.state.lock();
            let handler = &self.handler;
            let outcome = state
                .heap
                .push(tx, &mut |admitted| handler.on_admitted(admitted));
            (outcome, state.heap.threshold(), state.heap.len())
        };

        match &outcome {
            PushOutcome::Stale => self.metrics.record_stale(),
            PushOutcome::Duplicate => self.metrics.record_duplicate(),
            PushOutcome::Accepted(summary) => self.metrics.record_release(summary),
        }
        self.publish(watermark, buffered);
        outcome
    }

    fn set_threshold(&self, owner: OwnerToken, value: SequencePosition) -> ReleaseSummary {
        let _hold = self.lock.hold(owner);

        let (summary, watermark, buffered) = {
            let mut state = self.state.lock();
            let handler = &self.handler;
            let summary = state
                .heap
                .set_threshold(value, &mut |admitted| handler.on_admitted(admitted));
            (summary, state.heap.threshold(), state.heap.len())
        };

        debug!(
            requested = value,
            watermark,
            released = summary.dispatched(),
            discarded = summary.stale_discarded,
            "Threshold set"
        );
        self.metrics.record_release(&summary);
        self.publish(watermark, buffered);
        summary
    }

    fn get_threshold(&self, owner: OwnerToken) -> SequencePosition {
        let _hold = self.lock.hold(owner);
        self.state.lock().heap.threshold()
    }

    fn ack_cursor(&self) -> AckCursor {
        *self.acks.borrow()
    }

    fn stats(&self, owner: OwnerToken) -> AdmissionStats {
        let _hold = self.lock.hold(owner);
        self.state.lock().heap.stats()
    }
}

impl StateSnapshotApi for AdmissionCore {
    fn set_latest_state_db(
        &self,
        owner: OwnerToken,
        snapshot: Arc<dyn AccountDb>,
        baseline: SequencePosition,
        height: BlockHeight,
    ) -> SnapshotDecision {
        let _hold = self.lock.hold(owner);

        // Re-enters the lock held above.
        let watermark = self.get_threshold(owner);
        let root = snapshot.state_root();
        let decision = self
            .state
            .lock()
            .snapshot
            .offer(snapshot, baseline, height, watermark);

        match decision {
            SnapshotDecision::Adopted { .. } => {
                info!(height, baseline, root = ?&root[..4], "Adopted state snapshot");
                self.set_threshold(owner, baseline);
            }
            SnapshotDecision::Ignored { .. } => {
                debug!(height, baseline, watermark, "Ignoring state snapshot");
            }
        }

        self.metrics.record_snapshot(decision.is_adopted(), height);
        decision
    }

    fn get_latest_state_db(&self, owner: OwnerToken) -> Option<Arc<dyn AccountDb>> {
        let _hold = self.lock.hold(owner);
        self.state.lock().snapshot.current()
    }

    fn get_account_db_by_hash(&self, root: &Hash) -> Option<Arc<dyn AccountDb>> {
        let current = self.state.lock().snapshot.current();
        match current {
            Some(db) if db.state_root() == *root => Some(db),
            _ => self.history.account_db_by_hash(root),
        }
    }

    fn latest_height(&self, owner: OwnerToken) -> Option<BlockHeight> {
        let _hold = self.lock.hold(owner);
        self.state.lock().snapshot.latest_height()
    }
}

/// Builder for [`AdmissionCore`].
pub struct AdmissionCoreBuilder {
    config: AdmissionConfig,
    handler: Arc<dyn ApplicationHandler>,
    history: Arc<dyn StateHistory>,
    metrics: Arc<dyn AdmissionMetrics>,
    lock_observer: Arc<dyn LockLatencyObserver>,
    initial_watermark: SequencePosition,
}

impl AdmissionCoreBuilder {
    fn new(handler: Arc<dyn ApplicationHandler>) -> Self {
        Self {
            config: AdmissionConfig::default(),
            handler,
            history: Arc::new(NoStateHistory),
            metrics: Arc::new(NoopAdmissionMetrics),
            lock_observer: Arc::new(NoopLockObserver),
            initial_watermark: 0,
        }
    }

    pub fn with_config(mut self, config: AdmissionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn StateHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn AdmissionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_lock_observer(mut self, observer: Arc<dyn LockLatencyObserver>) -> Self {
        self.lock_observer = observer;
        self
    }

    /// Resume from a watermark restored out of band.
    pub fn with_initial_watermark(mut self, watermark: SequencePosition) -> Self {
        self.initial_watermark = watermark;
        self
    }

    pub fn build(self) -> AdmissionCore {
        let (acks, _) = watch::channel(AckCursor::new(self.initial_watermark));
        AdmissionCore {
            lock: ReentrantOwnerLock::with_observer(
                ADMISSION_LOCK,
                self.config.slow_lock_threshold(),
                self.lock_observer,
            ),
            state: Mutex::new(CoreState {
                heap: AdmissionHeap::with_watermark(self.initial_watermark),
                snapshot: SnapshotSlot::new(),
            }),
            handler: self.handler,
            history: self.history,
            metrics: self.metrics,
            acks,
        }
    }
}
