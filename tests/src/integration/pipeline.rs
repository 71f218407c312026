//! # Pipeline Tests
//!
//! Full node runtime observed from the event bus and the gateway side.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use node_runtime::adapters::GatewayTransport;
    use node_runtime::{NodeConfig, NodeRuntime};
    use parking_lot::Mutex;
    use qc_admission::ChannelHandler;
    use shared_bus::{BlockchainEvent, EventFilter, EventTopic, Subscription};
    use shared_types::{AckCursor, GatewayError, IngressUnit, SequencePosition, SubmitterId};
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Reports a disconnect until `reconnect` is called.
    #[derive(Default)]
    struct FlakyTransport {
        connected: AtomicBool,
        acks: Mutex<Vec<AckCursor>>,
        replays: Mutex<Vec<SequencePosition>>,
    }

    impl FlakyTransport {
        fn reconnect(&self) {
            self.connected.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl GatewayTransport for FlakyTransport {
        async fn acknowledge(&self, cursor: AckCursor) -> Result<(), GatewayError> {
            if !self.connected.load(Ordering::SeqCst) {
                return Err(GatewayError::Disconnected);
            }
            self.acks.lock().push(cursor);
            Ok(())
        }

        async fn request_replay(&self, from: SequencePosition) -> Result<(), GatewayError> {
            self.replays.lock().push(from);
            Ok(())
        }
    }

    fn unit(position: SequencePosition, submitter: &str) -> IngressUnit {
        IngressUnit {
            position,
            payload: vec![position as u8],
            submitter: SubmitterId::new(submitter),
        }
    }

    fn start(transport: Arc<FlakyTransport>) -> NodeRuntime {
        let mut config = NodeConfig::default();
        config.admission.ingress_capacity = 32;
        let (application, _admitted) = ChannelHandler::new();
        NodeRuntime::new(config, Arc::new(application), transport).unwrap()
    }

    async fn next_event(subscription: &mut Subscription) -> BlockchainEvent {
        timeout(Duration::from_secs(5), subscription.recv())
            .await
            .expect("no event within timeout")
            .expect("event bus closed")
    }

    // =============================================================================
    // EVENT BUS OBSERVATION
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bus_sees_admissions_in_sequence_order() {
        let transport = Arc::new(FlakyTransport::default());
        transport.reconnect();
        let runtime = start(transport);
        let mut events = runtime
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Admission]));
        let ingress = runtime.start().unwrap();

        for position in (1..=5).rev() {
            ingress.submit(unit(position, "gw-a")).await.unwrap();
        }

        let mut admitted = Vec::new();
        let mut watermarks = Vec::new();
        while admitted.len() < 5 || watermarks.last() != Some(&5) {
            match next_event(&mut events).await {
                BlockchainEvent::TransactionAdmitted {
                    position,
                    arrival_seq,
                    submitter,
                } => {
                    assert_eq!(submitter.as_str(), "gw-a");
                    admitted.push((position, arrival_seq));
                }
                BlockchainEvent::AckAdvanced { watermark, .. } => watermarks.push(watermark),
                _ => {}
            }
        }

        // Submitted 5,4,3,2,1: arrival order is the reverse of admission order.
        assert_eq!(admitted, vec![(1, 4), (2, 3), (3, 2), (4, 1), (5, 0)]);
        assert!(watermarks.windows(2).all(|w| w[0] < w[1]));

        runtime.shutdown().await.unwrap();
    }

    // =============================================================================
    // GATEWAY RECONNECTION
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnect_requests_replay_then_recovers() {
        let transport = Arc::new(FlakyTransport::default());
        let runtime = start(Arc::clone(&transport));
        let mut gateway = runtime
            .bus()
            .subscribe(EventFilter::topics(vec![EventTopic::Gateway]));
        let ingress = runtime.start().unwrap();

        ingress.submit(unit(1, "gw-b")).await.unwrap();
        assert!(matches!(
            next_event(&mut gateway).await,
            BlockchainEvent::GatewayDisconnected { .. }
        ));
        timeout(Duration::from_secs(5), async {
            while !transport.replays.lock().contains(&2) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("replay not requested from next expected position");

        // Gateway replays from 2 after reconnecting; position 1 again is stale.
        transport.reconnect();
        for position in 1..=3 {
            ingress.submit(unit(position, "gw-b")).await.unwrap();
        }

        let report = runtime.shutdown().await.unwrap();
        assert_eq!(report.received, 4);
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.stale, 1);
        assert_eq!(transport.acks.lock().iter().max(), Some(&AckCursor::new(3)));
    }
}
