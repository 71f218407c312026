//! # Shared Bus
//!
//! Broadcast bus between node components. Publishers never wait on
//! subscribers; each subscriber filters by topic on its own side.
//!
//! | Topic | Events | Main consumer |
//! |-------|--------|---------------|
//! | `Admission` | `TransactionAdmitted`, `AckAdvanced`, `SnapshotHandoff` | observers, tests |
//! | `BlockCommit` | `BlockCommitted` | block-commit handler |
//! | `Gateway` | `GatewayDisconnected` | operators |
//! | `DeadLetterQueue` | `CriticalError` | dead letter monitor |

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{BlockchainEvent, EventFilter, EventTopic};
pub use publisher::{EmitObserver, EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Events buffered per subscriber before it starts losing the oldest.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
