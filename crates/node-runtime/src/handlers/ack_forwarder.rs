//! # Ack Forwarder
//!
//! Pushes every watermark advance to the gateway transport and announces it
//! on the bus. When the transport reports a disconnect, asks the gateway to
//! replay from the first position not yet released.

use std::sync::Arc;

use quantum_telemetry::{log_event, metric_inc, COMPONENT_ERRORS, GATEWAY_ACKS, GATEWAY_REPLAYS};
use shared_bus::{BlockchainEvent, InMemoryEventBus};
use shared_types::{AckCursor, GatewayError};
use tokio::sync::watch;
use tracing::info;

use crate::adapters::GatewayTransport;

const COMPONENT: &str = "gateway";

pub struct AckForwarder {
    acks: watch::Receiver<AckCursor>,
    transport: Arc<dyn GatewayTransport>,
    bus: Arc<InMemoryEventBus>,
}

impl AckForwarder {
    pub fn new(
        acks: watch::Receiver<AckCursor>,
        transport: Arc<dyn GatewayTransport>,
        bus: Arc<InMemoryEventBus>,
    ) -> Self {
        Self {
            acks,
            transport,
            bus,
        }
    }

    /// Forward until the admission core is dropped. Intermediate cursors may
    /// be skipped; the latest one always goes out.
    pub async fn run(mut self) {
        info!("Ack forwarder started");

        while self.acks.changed().await.is_ok() {
            let cursor = *self.acks.borrow_and_update();
            // Failures are reported on the bus; the next advance retries.
            let _ = self.forward(cursor).await;
        }

        info!("Ack channel closed, ack forwarder stopping");
    }

    /// Send the latest cursor once more, e.g. before shutdown.
    pub async fn flush(&self) -> Result<(), GatewayError> {
        let cursor = *self.acks.borrow();
        self.forward(cursor).await
    }

    pub async fn forward(&self, cursor: AckCursor) -> Result<(), GatewayError> {
        self.bus.emit(BlockchainEvent::AckAdvanced {
            watermark: cursor.watermark,
            next_expected: cursor.next_expected(),
        });

        match self.transport.acknowledge(cursor).await {
            Ok(()) => {
                metric_inc!(GATEWAY_ACKS);
                Ok(())
            }
            Err(GatewayError::Disconnected) => {
                log_event!(
                    warn,
                    COMPONENT,
                    "Gateway disconnected, requesting replay",
                    next_expected = cursor.next_expected()
                );
                self.bus.emit(BlockchainEvent::GatewayDisconnected {
                    reason: GatewayError::Disconnected.to_string(),
                });
                self.resume(cursor).await
            }
            Err(e) => {
                self.report(&e, "ack_failed");
                Err(e)
            }
        }
    }

    /// Ask the gateway to resend from the cursor's next expected position.
    pub async fn resume(&self, cursor: AckCursor) -> Result<(), GatewayError> {
        let from = cursor.next_expected();
        match self.transport.request_replay(from).await {
            Ok(()) => {
                metric_inc!(GATEWAY_REPLAYS);
                log_event!(info, COMPONENT, "Replay requested", from);
                Ok(())
            }
            Err(e) => {
                self.report(&e, "replay_failed");
                Err(e)
            }
        }
    }

    fn report(&self, error: &GatewayError, kind: &str) {
        metric_inc!(COMPONENT_ERRORS, &[COMPONENT, kind]);
        log_event!(error, COMPONENT, "Gateway transport failure", error = %error);
        self.bus.emit(BlockchainEvent::CriticalError {
            component: COMPONENT.to_string(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::SequencePosition;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedTransport {
        acks: Mutex<Vec<AckCursor>>,
        replays: Mutex<Vec<SequencePosition>>,
        fail_acks_with: Mutex<Option<GatewayError>>,
    }

    #[async_trait]
    impl GatewayTransport for ScriptedTransport {
        async fn acknowledge(&self, cursor: AckCursor) -> Result<(), GatewayError> {
            if let Some(e) = self.fail_acks_with.lock().clone() {
                return Err(e);
            }
            self.acks.lock().push(cursor);
            Ok(())
        }

        async fn request_replay(&self, from: SequencePosition) -> Result<(), GatewayError> {
            self.replays.lock().push(from);
            Ok(())
        }
    }

    fn forwarder(
        transport: Arc<ScriptedTransport>,
    ) -> (watch::Sender<AckCursor>, AckForwarder, Arc<InMemoryEventBus>) {
        let (tx, rx) = watch::channel(AckCursor::default());
        let bus = Arc::new(InMemoryEventBus::new());
        let forwarder = AckForwarder::new(rx, transport, bus.clone());
        (tx, forwarder, bus)
    }

    #[tokio::test]
    async fn test_forwards_latest_cursor_until_closed() {
        let transport = Arc::new(ScriptedTransport::default());
        let (tx, forwarder, _bus) = forwarder(transport.clone());
        let task = tokio::spawn(forwarder.run());

        tx.send(AckCursor::new(3)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(AckCursor::new(7)).unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("forwarder did not stop")
            .unwrap();

        let acks = transport.acks.lock().clone();
        assert_eq!(acks.last(), Some(&AckCursor::new(7)));
        assert!(acks.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_disconnect_requests_replay_from_next_expected() {
        let transport = Arc::new(ScriptedTransport::default());
        *transport.fail_acks_with.lock() = Some(GatewayError::Disconnected);
        let (_tx, forwarder, bus) = forwarder(transport.clone());
        let mut gateway_events = bus.subscribe(EventFilter::topics(vec![EventTopic::Gateway]));

        forwarder.forward(AckCursor::new(41)).await.unwrap();

        assert_eq!(*transport.replays.lock(), vec![42]);
        assert!(matches!(
            gateway_events.try_recv(),
            Ok(Some(BlockchainEvent::GatewayDisconnected { .. }))
        ));
    }

    #[tokio::test]
    async fn test_transport_error_goes_to_dead_letter_queue() {
        let transport = Arc::new(ScriptedTransport::default());
        *transport.fail_acks_with.lock() = Some(GatewayError::Transport("reset".into()));
        let (_tx, forwarder, bus) = forwarder(transport);
        let mut dlq = bus.subscribe(EventFilter::topics(vec![EventTopic::DeadLetterQueue]));

        let result = forwarder.forward(AckCursor::new(1)).await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert!(matches!(
            dlq.try_recv(),
            Ok(Some(BlockchainEvent::CriticalError { .. }))
        ));
    }
}
