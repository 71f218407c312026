//! # Gateway Adapters
//!
//! The inbound side stamps gateway submissions with arrival metadata and
//! queues them for admission. The outbound side is the transport port used
//! to acknowledge progress and request replays.

use async_trait::async_trait;
use parking_lot::RwLock;
use qc_admission::{AdmissionError, IngressSender};
use shared_types::{
    AckCursor, ArrivalMetadata, GatewayError, IngressUnit, SequencePosition, SequencedTransaction,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Transport back to the gateway.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Report the resumption cursor.
    async fn acknowledge(&self, cursor: AckCursor) -> Result<(), GatewayError>;

    /// Ask the gateway to resend everything from `from` onward.
    async fn request_replay(&self, from: SequencePosition) -> Result<(), GatewayError>;
}

/// Transport that only logs. Used when no gateway is attached.
#[derive(Debug, Default)]
pub struct LoggingGatewayTransport;

#[async_trait]
impl GatewayTransport for LoggingGatewayTransport {
    async fn acknowledge(&self, cursor: AckCursor) -> Result<(), GatewayError> {
        debug!(
            watermark = cursor.watermark,
            next_expected = cursor.next_expected(),
            "Acknowledged"
        );
        Ok(())
    }

    async fn request_replay(&self, from: SequencePosition) -> Result<(), GatewayError> {
        info!(from, "Replay requested");
        Ok(())
    }
}

/// Entry point for gateway submissions.
///
/// Clones share one queue and one arrival counter. After [`close`] every
/// clone rejects further submissions with `IngressClosed`.
///
/// [`close`]: GatewayIngressAdapter::close
#[derive(Clone)]
pub struct GatewayIngressAdapter {
    sender: Arc<RwLock<Option<IngressSender>>>,
    arrival_seq: Arc<AtomicU64>,
}

impl GatewayIngressAdapter {
    pub fn new(sender: IngressSender) -> Self {
        Self {
            sender: Arc::new(RwLock::new(Some(sender))),
            arrival_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    fn stamp(&self, unit: IngressUnit) -> SequencedTransaction {
        let arrival = ArrivalMetadata {
            received_at_ms: u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
            arrival_seq: self.arrival_seq.fetch_add(1, Ordering::Relaxed),
        };
        SequencedTransaction::from_ingress(unit, arrival)
    }

    fn sender(&self) -> Result<IngressSender, AdmissionError> {
        self.sender.read().clone().ok_or(AdmissionError::IngressClosed)
    }

    /// Queue a submission, waiting while the queue is full.
    pub async fn submit(&self, unit: IngressUnit) -> Result<ArrivalMetadata, AdmissionError> {
        let sender = self.sender()?;
        let tx = self.stamp(unit);
        let arrival = tx.arrival;
        sender.send(tx).await?;
        Ok(arrival)
    }

    /// Queue a submission from a plain thread, parking it while the queue is
    /// full.
    pub fn submit_blocking(&self, unit: IngressUnit) -> Result<ArrivalMetadata, AdmissionError> {
        let sender = self.sender()?;
        let tx = self.stamp(unit);
        let arrival = tx.arrival;
        sender.blocking_send(tx)?;
        Ok(arrival)
    }

    /// Queue depth, or zero once closed.
    pub fn depth(&self) -> usize {
        self.sender.read().as_ref().map_or(0, IngressSender::depth)
    }

    /// Stop accepting submissions. The admission worker drains what is
    /// already queued and exits once in-flight submissions finish.
    pub fn close(&self) {
        if self.sender.write().take().is_some() {
            info!(
                submitted = self.arrival_seq.load(Ordering::Relaxed),
                "Gateway ingress closed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}
