//! # Event Bus Adapter
//!
//! Application handler that announces every admitted transaction on the
//! shared bus before passing it to the application.

use std::sync::Arc;

use qc_admission::ApplicationHandler;
use shared_bus::{BlockchainEvent, InMemoryEventBus};
use shared_types::SequencedTransaction;

/// Publishes `TransactionAdmitted`, then forwards to the wrapped handler.
///
/// Runs inside the admission release phase, so both steps are
/// non-blocking: bus publication is a broadcast send.
pub struct BusAdmissionHandler {
    bus: Arc<InMemoryEventBus>,
    downstream: Arc<dyn ApplicationHandler>,
}

impl BusAdmissionHandler {
    pub fn new(bus: Arc<InMemoryEventBus>, downstream: Arc<dyn ApplicationHandler>) -> Self {
        Self { bus, downstream }
    }
}

impl ApplicationHandler for BusAdmissionHandler {
    fn on_admitted(&self, tx: SequencedTransaction) {
        self.bus.emit(BlockchainEvent::TransactionAdmitted {
            position: tx.position,
            submitter: tx.submitter.clone(),
            arrival_seq: tx.arrival.arrival_seq,
        });
        self.downstream.on_admitted(tx);
    }
}
