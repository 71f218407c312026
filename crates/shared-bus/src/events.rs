//! # Node Events
//!
//! Everything that flows through the shared bus: admission progress, block
//! commits, and critical errors routed to the dead letter queue.

use serde::{Deserialize, Serialize};
use shared_types::entities::{BlockHeight, CommittedBlock, SequencePosition, SubmitterId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BlockchainEvent {
    // =========================================================================
    // ADMISSION
    // =========================================================================
    /// A transaction was released to the application.
    TransactionAdmitted {
        /// Sequence position (0 for wildcard transactions).
        position: SequencePosition,
        /// Gateway submitter.
        submitter: SubmitterId,
        /// Arrival order assigned by the ingress adapter.
        arrival_seq: u64,
    },

    /// The release watermark moved forward.
    AckAdvanced {
        /// Highest contiguously released position.
        watermark: SequencePosition,
        /// First position the gateway should resend after a reconnect.
        next_expected: SequencePosition,
    },

    /// A committed block's state was offered to the admission pipeline.
    SnapshotHandoff {
        height: BlockHeight,
        baseline: SequencePosition,
        adopted: bool,
    },

    // =========================================================================
    // BLOCK COMMIT
    // =========================================================================
    /// A block was committed and its post-state is available.
    /// Consumed by the block-commit listener, which hands the state to
    /// admission via `set_latest_state_db`.
    BlockCommitted(CommittedBlock),

    // =========================================================================
    // GATEWAY
    // =========================================================================
    /// The gateway connection dropped; the forwarder will request a replay.
    GatewayDisconnected {
        /// Transport-reported reason.
        reason: String,
    },

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// Critical error requiring operator attention.
    CriticalError {
        /// Component that encountered the error.
        component: String,
        /// Error description.
        error: String,
    },
}

impl BlockchainEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionAdmitted { .. }
            | Self::AckAdvanced { .. }
            | Self::SnapshotHandoff { .. } => EventTopic::Admission,
            Self::BlockCommitted(_) => EventTopic::BlockCommit,
            Self::GatewayDisconnected { .. } => EventTopic::Gateway,
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Short stable name, used as a metrics label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransactionAdmitted { .. } => "transaction_admitted",
            Self::AckAdvanced { .. } => "ack_advanced",
            Self::SnapshotHandoff { .. } => "snapshot_handoff",
            Self::BlockCommitted(_) => "block_committed",
            Self::GatewayDisconnected { .. } => "gateway_disconnected",
            Self::CriticalError { .. } => "critical_error",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Admission pipeline progress.
    Admission,
    /// Block commits.
    BlockCommit,
    /// Gateway connection state.
    Gateway,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BlockchainEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }

    /// Canonical topic set: sorted, deduplicated, empty when it accepts
    /// everything. Filters with equal keys see the same events.
    #[must_use]
    pub fn key(&self) -> Vec<EventTopic> {
        if self.topics.is_empty() || self.topics.contains(&EventTopic::All) {
            return Vec::new();
        }
        let mut topics = self.topics.clone();
        topics.sort_unstable();
        topics.dedup();
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(height: u64) -> BlockchainEvent {
        BlockchainEvent::BlockCommitted(CommittedBlock {
            height,
            ..CommittedBlock::default()
        })
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(committed(1).topic(), EventTopic::BlockCommit);

        let ack = BlockchainEvent::AckAdvanced {
            watermark: 4,
            next_expected: 5,
        };
        assert_eq!(ack.topic(), EventTopic::Admission);
        assert_eq!(ack.kind(), "ack_advanced");
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&committed(1)));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::BlockCommit]);

        assert!(filter.matches(&committed(1)));

        let critical = BlockchainEvent::CriticalError {
            component: "gateway".into(),
            error: "boom".into(),
        };
        assert!(!filter.matches(&critical));
    }

    #[test]
    fn test_all_topic_in_list_matches_everything() {
        let filter = EventFilter::topics(vec![EventTopic::Gateway, EventTopic::All]);
        assert!(filter.matches(&committed(3)));
    }

    #[test]
    fn test_key_is_order_insensitive() {
        let a = EventFilter::topics(vec![EventTopic::Gateway, EventTopic::Admission]);
        let b = EventFilter::topics(vec![
            EventTopic::Admission,
            EventTopic::Gateway,
            EventTopic::Admission,
        ]);
        assert_eq!(a.key(), b.key());
        assert_eq!(
            EventFilter::topics(vec![EventTopic::All]).key(),
            EventFilter::all().key()
        );
    }
}
