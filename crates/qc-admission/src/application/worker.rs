//! Admission Worker
//!
//! Drains the ingress queue on a dedicated thread and pushes every item
//! into the admission core under its own owner token. Exits when the queue
//! closes.

use crate::adapters::ingress::IngressReceiver;
use crate::domain::errors::AdmissionError;
use crate::domain::value_objects::PushOutcome;
use crate::lock::OwnerToken;
use crate::ports::inbound::TransactionAdmissionApi;
use crate::ports::outbound::{AdmissionMetrics, NoopAdmissionMetrics};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, trace};

/// Totals reported when the worker stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub received: u64,
    pub dispatched: u64,
    pub stale: u64,
    pub duplicate: u64,
}

pub struct AdmissionWorker {
    admission: Arc<dyn TransactionAdmissionApi>,
    receiver: IngressReceiver,
    owner: OwnerToken,
    metrics: Arc<dyn AdmissionMetrics>,
}

impl AdmissionWorker {
    pub fn new(admission: Arc<dyn TransactionAdmissionApi>, receiver: IngressReceiver) -> Self {
        Self {
            admission,
            receiver,
            owner: OwnerToken::fresh(),
            metrics: Arc::new(NoopAdmissionMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn AdmissionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn owner(&self) -> OwnerToken {
        self.owner
    }

    /// Run on a new named OS thread.
    pub fn spawn(self, thread_name: &str) -> Result<WorkerHandle, AdmissionError> {
        let owner = self.owner;
        let thread = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || self.run())
            .map_err(AdmissionError::WorkerSpawn)?;

        info!(owner = %owner, thread = thread_name, "Admission worker spawned");
        Ok(WorkerHandle { thread, owner })
    }

    /// Drain the queue on the current thread. Must not be called from
    /// inside an async runtime.
    pub fn run(mut self) -> WorkerReport {
        info!(owner = %self.owner, capacity = self.receiver.capacity(), "Admission worker started");
        let mut report = WorkerReport::default();

        while let Some(tx) = self.receiver.blocking_recv() {
            report.received += 1;
            let position = tx.position;

            match self.admission.push(self.owner, tx) {
                PushOutcome::Stale => report.stale += 1,
                PushOutcome::Duplicate => report.duplicate += 1,
                PushOutcome::Accepted(summary) => {
                    report.dispatched += summary.dispatched();
                    trace!(position, released = summary.dispatched(), "Pushed");
                }
            }
            self.metrics.set_ingress_depth(self.receiver.depth());
        }

        info!(
            received = report.received,
            dispatched = report.dispatched,
            stale = report.stale,
            duplicate = report.duplicate,
            "Ingress closed, admission worker stopping"
        );
        report
    }
}

/// Join handle for a spawned [`AdmissionWorker`].
#[derive(Debug)]
pub struct WorkerHandle {
    thread: JoinHandle<WorkerReport>,
    owner: OwnerToken,
}

impl WorkerHandle {
    pub fn owner(&self) -> OwnerToken {
        self.owner
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker to drain and stop. A panic on the worker thread
    /// is re-raised here.
    pub fn join(self) -> WorkerReport {
        match self.thread.join() {
            Ok(report) => report,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}
