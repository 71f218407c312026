//! # Event Publisher
//!
//! Broadcast side of the bus. Emitting never blocks and never fails: an
//! event nobody listens to is dropped, and a slow subscriber lags rather
//! than holding up the emitter. Both properties matter because the
//! admission worker emits from inside its release pass.

use crate::events::{BlockchainEvent, EventFilter, EventTopic};
use crate::subscriber::{EventStream, Subscription, TopicRegistry};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Called after every emit with the event kind and the number of
/// subscribers that received it.
pub type EmitObserver = Arc<dyn Fn(&'static str, usize) + Send + Sync>;

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event, returning how many subscribers received it.
    async fn publish(&self, event: BlockchainEvent) -> usize;

    /// Events emitted since creation, delivered or not.
    fn events_published(&self) -> u64;
}

/// In-memory event bus over `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BlockchainEvent>,
    registry: Arc<TopicRegistry>,
    emitted: AtomicU64,
    observer: Option<EmitObserver>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` events are buffered per subscriber before it lags.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(TopicRegistry::default()),
            emitted: AtomicU64::new(0),
            observer: None,
            capacity,
        }
    }

    /// Install a hook run after every emit, e.g. a metrics counter.
    #[must_use]
    pub fn with_observer(mut self, observer: EmitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Subscribe to events matching a filter. Only events emitted after this
    /// call are seen.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let key = self.registry.register(&filter);
        debug!(topics = ?key, "Subscription opened");
        Subscription::new(self.sender.subscribe(), filter, Arc::clone(&self.registry), key)
    }

    /// Like [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    /// Emit without awaiting. Safe from plain threads, including the
    /// admission worker.
    pub fn emit(&self, event: BlockchainEvent) -> usize {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        let kind = event.kind();
        let dead_letter = event.topic() == EventTopic::DeadLetterQueue;

        let receivers = self.sender.send(event).unwrap_or(0);
        match receivers {
            0 if dead_letter => warn!(kind, "Critical error emitted with no dead letter subscriber"),
            0 => trace!(kind, "Event emitted with no subscribers"),
            n => trace!(kind, receivers = n, "Event emitted"),
        }

        if let Some(observer) = &self.observer {
            observer(kind, receivers);
        }
        receivers
    }

    /// Live receivers, including event streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live `Subscription`s whose filter selects the same topics as `filter`.
    #[must_use]
    pub fn subscriptions_for(&self, filter: &EventFilter) -> usize {
        self.registry.count(filter)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BlockchainEvent) -> usize {
        self.emit(event)
    }

    fn events_published(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}
