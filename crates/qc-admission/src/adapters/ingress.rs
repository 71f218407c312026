//! Bounded ingress queue between gateway producers and the admission worker.
//!
//! Producers block (or await) when the queue is full; nothing is dropped.
//! The queue closes once every sender is gone.

use crate::domain::errors::AdmissionError;
use shared_types::SequencedTransaction;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Create an ingress queue holding at most `capacity` transactions.
pub fn ingress_channel(
    capacity: usize,
) -> Result<(IngressSender, IngressReceiver), AdmissionError> {
    if capacity == 0 {
        return Err(AdmissionError::InvalidConfig(
            "ingress capacity must be positive".into(),
        ));
    }

    let (tx, rx) = mpsc::channel(capacity);
    let pending = Arc::new(AtomicUsize::new(0));

    Ok((
        IngressSender {
            inner: tx,
            pending: Arc::clone(&pending),
            capacity,
        },
        IngressReceiver {
            inner: rx,
            pending,
            capacity,
        },
    ))
}

/// Producer side. Cheap to clone; one per gateway connection is fine.
#[derive(Clone, Debug)]
pub struct IngressSender {
    inner: mpsc::Sender<SequencedTransaction>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

impl IngressSender {
    /// Enqueue, waiting for space when the queue is full.
    pub async fn send(&self, tx: SequencedTransaction) -> Result<(), AdmissionError> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.inner.send(tx).await.map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            AdmissionError::IngressClosed
        })
    }

    /// Enqueue from a plain thread, parking it while the queue is full.
    ///
    /// Panics if called from inside an async runtime.
    pub fn blocking_send(&self, tx: SequencedTransaction) -> Result<(), AdmissionError> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.inner.blocking_send(tx).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            AdmissionError::IngressClosed
        })
    }

    /// Transactions queued or waiting for space.
    pub fn depth(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer side, owned by the admission worker.
#[derive(Debug)]
pub struct IngressReceiver {
    inner: mpsc::Receiver<SequencedTransaction>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

impl IngressReceiver {
    /// Next transaction, or `None` once all senders are dropped and the
    /// queue is drained.
    pub fn blocking_recv(&mut self) -> Option<SequencedTransaction> {
        let tx = self.inner.blocking_recv()?;
        self.pending.fetch_sub(1, Ordering::Relaxed);
        Some(tx)
    }

    pub async fn recv(&mut self) -> Option<SequencedTransaction> {
        let tx = self.inner.recv().await?;
        self.pending.fetch_sub(1, Ordering::Relaxed);
        Some(tx)
    }

    /// Refuse further sends. Already queued items can still be received.
    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn depth(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
