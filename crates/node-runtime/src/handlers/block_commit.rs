//! # Block Commit Handler
//!
//! Listens for `BlockCommitted` on the bus, records the block's post-state
//! in the state history, and hands it to admission through
//! `set_latest_state_db`.
//!
//! The admission call can wait on the admission lock, so it runs on the
//! blocking pool rather than an async worker.

use std::sync::Arc;

use qc_admission::{AccountDb, OwnerToken, SnapshotDecision, StateSnapshotApi};
use quantum_telemetry::{
    component_span, log_block_event, time_histogram, SNAPSHOT_HANDOFF_DURATION,
};
use shared_bus::{BlockchainEvent, InMemoryEventBus, Subscription};
use shared_types::CommittedBlock;
use tracing::{error, info};

use crate::adapters::{CommittedState, InMemoryStateHistory};

const COMPONENT: &str = "block-commit";

pub struct BlockCommitHandler {
    subscription: Subscription,
    admission: Arc<dyn StateSnapshotApi>,
    history: Arc<InMemoryStateHistory>,
    bus: Arc<InMemoryEventBus>,
    owner: OwnerToken,
}

impl BlockCommitHandler {
    pub fn new(
        subscription: Subscription,
        admission: Arc<dyn StateSnapshotApi>,
        history: Arc<InMemoryStateHistory>,
        bus: Arc<InMemoryEventBus>,
    ) -> Self {
        Self {
            subscription,
            admission,
            history,
            bus,
            owner: OwnerToken::fresh(),
        }
    }

    pub fn owner(&self) -> OwnerToken {
        self.owner
    }

    /// Handle commits until the bus closes.
    pub async fn run(mut self) {
        info!(owner = %self.owner, "Block commit handler started");

        while let Some(event) = self.subscription.recv().await {
            if let BlockchainEvent::BlockCommitted(block) = event {
                self.handle(block).await;
            }
        }

        info!("Event bus closed, block commit handler stopping");
    }

    /// Hand one committed block to admission. `None` only if the runtime is
    /// shutting down and the handoff was cancelled.
    pub async fn handle(&self, block: CommittedBlock) -> Option<SnapshotDecision> {
        let snapshot: Arc<dyn AccountDb> = Arc::new(CommittedState::from_block(&block));
        self.history.record(Arc::clone(&snapshot));

        let admission = Arc::clone(&self.admission);
        let owner = self.owner;
        let (height, baseline) = (block.height, block.baseline_sequence);
        let span = component_span!("snapshot_handoff", component = COMPONENT, height, baseline);

        let handoff = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let _timer = time_histogram!(SNAPSHOT_HANDOFF_DURATION);
            admission.set_latest_state_db(owner, snapshot, baseline, height)
        })
        .await;

        let decision = match handoff {
            Ok(decision) => decision,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                error!(height, error = %e, "Snapshot handoff cancelled");
                return None;
            }
        };

        if decision.is_adopted() {
            log_block_event!(info, COMPONENT, "Committed state adopted", height, baseline);
        } else {
            log_block_event!(debug, COMPONENT, "Committed state behind watermark", height, baseline);
        }

        self.bus.emit(BlockchainEvent::SnapshotHandoff {
            height,
            baseline,
            adopted: decision.is_adopted(),
        });
        Some(decision)
    }
}
