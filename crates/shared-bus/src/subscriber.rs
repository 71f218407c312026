//! # Event Subscriber
//!
//! Receiving side of the bus. Every receiver sees every event and filters
//! locally. A receiver that falls more than the bus capacity behind skips
//! the oldest events and logs how many it lost.

use crate::events::{BlockchainEvent, EventFilter, EventTopic};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// Live subscription counts per canonical topic set.
#[derive(Debug, Default)]
pub(crate) struct TopicRegistry {
    live: RwLock<HashMap<Vec<EventTopic>, usize>>,
}

impl TopicRegistry {
    pub(crate) fn register(&self, filter: &EventFilter) -> Vec<EventTopic> {
        let key = filter.key();
        *self.live.write().entry(key.clone()).or_insert(0) += 1;
        key
    }

    pub(crate) fn release(&self, key: &[EventTopic]) {
        let mut live = self.live.write();
        if let Some(count) = live.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                live.remove(key);
            }
        }
    }

    pub(crate) fn count(&self, filter: &EventFilter) -> usize {
        self.live.read().get(&filter.key()).copied().unwrap_or(0)
    }
}

/// A filtered receiver. Deregisters itself when dropped.
pub struct Subscription {
    receiver: broadcast::Receiver<BlockchainEvent>,
    filter: EventFilter,
    registry: Arc<TopicRegistry>,
    key: Vec<EventTopic>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<BlockchainEvent>,
        filter: EventFilter,
        registry: Arc<TopicRegistry>,
        key: Vec<EventTopic>,
    ) -> Self {
        Self {
            receiver,
            filter,
            registry,
            key,
        }
    }

    /// Next matching event, or `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<BlockchainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, topics = ?self.key, "Subscriber lagged, events lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<BlockchainEvent>, SubscriptionError> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, topics = ?self.key, "Subscriber lagged, events lost");
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.release(&self.key);
        debug!(topics = ?self.key, "Subscription closed");
    }
}

/// Filtered event stream for use with stream combinators.
pub struct EventStream {
    inner: BroadcastStream<BlockchainEvent>,
    filter: EventFilter,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<BlockchainEvent>, filter: EventFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = BlockchainEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(event)) if this.filter.matches(&event) => return Poll::Ready(Some(event)),
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, topics = ?this.filter.key(), "Event stream lagged, events lost");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::InMemoryEventBus;
    use shared_types::{CommittedBlock, SubmitterId};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn committed(height: u64) -> BlockchainEvent {
        BlockchainEvent::BlockCommitted(CommittedBlock {
            height,
            ..CommittedBlock::default()
        })
    }

    fn admitted(position: u64) -> BlockchainEvent {
        BlockchainEvent::TransactionAdmitted {
            position,
            submitter: SubmitterId::new("gw"),
            arrival_seq: 0,
        }
    }

    fn critical() -> BlockchainEvent {
        BlockchainEvent::CriticalError {
            component: "gateway".into(),
            error: "transport reset".into(),
        }
    }

    #[tokio::test]
    async fn test_block_commit_subscriber_skips_other_topics() {
        let bus = InMemoryEventBus::new();
        let mut commits = bus.subscribe(EventFilter::topics(vec![EventTopic::BlockCommit]));

        bus.emit(admitted(1));
        bus.emit(critical());
        bus.emit(committed(7));

        let received = timeout(Duration::from_millis(100), commits.recv())
            .await
            .expect("timeout")
            .expect("event");
        match received {
            BlockchainEvent::BlockCommitted(block) => assert_eq!(block.height, 7),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_lagged_subscriber_resumes_at_oldest_retained() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());

        for height in 1..=5 {
            bus.emit(committed(height));
        }

        let mut heights = Vec::new();
        while let Ok(Some(BlockchainEvent::BlockCommitted(block))) = sub.try_recv() {
            heights.push(block.height);
        }
        assert_eq!(heights, vec![4, 5]);
    }

    #[test]
    fn test_drop_deregisters() {
        let bus = InMemoryEventBus::new();
        let dlq = EventFilter::topics(vec![EventTopic::DeadLetterQueue]);

        let first = bus.subscribe(dlq.clone());
        let second = bus.subscribe(dlq.clone());
        assert_eq!(bus.subscriptions_for(&dlq), 2);

        drop(first);
        assert_eq!(bus.subscriptions_for(&dlq), 1);
        drop(second);
        assert_eq!(bus.subscriptions_for(&dlq), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_after_bus_dropped() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(matches!(sub.try_recv(), Ok(None)));

        drop(bus);

        assert!(sub.recv().await.is_none());
        assert!(matches!(sub.try_recv(), Err(SubscriptionError::Closed)));
    }

    #[tokio::test]
    async fn test_dead_letter_stream_ends_with_bus() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.event_stream(EventFilter::topics(vec![EventTopic::DeadLetterQueue]));

        bus.emit(committed(1));
        bus.emit(critical());
        bus.emit(admitted(2));
        drop(bus);

        let events: Vec<_> = timeout(Duration::from_millis(100), async {
            let mut out = Vec::new();
            while let Some(event) = stream.next().await {
                out.push(event.kind());
            }
            out
        })
        .await
        .expect("timeout");

        assert_eq!(events, vec!["critical_error"]);
        assert_eq!(EventStream::filter(&stream).topics, vec![EventTopic::DeadLetterQueue]);
    }
}
