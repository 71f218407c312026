//! Lock latency instrumentation.
//!
//! Every acquisition of a [`ReentrantOwnerLock`](super::ReentrantOwnerLock)
//! reports how long the caller waited, and every release reports how long
//! the hold lasted. Observations go to a [`LockLatencyObserver`]; anything
//! past the slow threshold is also logged.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::OwnerToken;

/// Sink for lock wait/hold durations.
///
/// Implementations are called outside the lock's internal mutex but may be
/// called while the caller still holds the owner lock, so they must not block.
pub trait LockLatencyObserver: Send + Sync {
    /// Time between calling `lock` and becoming owner.
    fn observe_wait(&self, lock: &'static str, waited: Duration);

    /// Time between becoming owner and `unlock`.
    fn observe_hold(&self, lock: &'static str, held: Duration);
}

/// Observer that drops every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLockObserver;

impl LockLatencyObserver for NoopLockObserver {
    fn observe_wait(&self, _lock: &'static str, _waited: Duration) {}
    fn observe_hold(&self, _lock: &'static str, _held: Duration) {}
}

/// Reporting policy attached to one named lock.
#[derive(Clone)]
pub(crate) struct LatencyReporter {
    name: &'static str,
    slow_threshold: Duration,
    observer: Arc<dyn LockLatencyObserver>,
}

impl LatencyReporter {
    pub(crate) fn new(
        name: &'static str,
        slow_threshold: Duration,
        observer: Arc<dyn LockLatencyObserver>,
    ) -> Self {
        Self {
            name,
            slow_threshold,
            observer,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn wait(&self, owner: OwnerToken, waited: Duration) {
        self.observer.observe_wait(self.name, waited);
        if waited >= self.slow_threshold {
            warn!(
                lock = self.name,
                owner = %owner,
                waited_ms = waited.as_millis() as u64,
                "Slow lock acquisition"
            );
        }
    }

    pub(crate) fn hold(&self, owner: OwnerToken, held: Duration) {
        self.observer.observe_hold(self.name, held);
        if held >= self.slow_threshold {
            warn!(
                lock = self.name,
                owner = %owner,
                held_ms = held.as_millis() as u64,
                "Lock held past slow threshold"
            );
        }
    }
}

impl std::fmt::Debug for LatencyReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyReporter")
            .field("name", &self.name)
            .field("slow_threshold", &self.slow_threshold)
            .finish()
    }
}
