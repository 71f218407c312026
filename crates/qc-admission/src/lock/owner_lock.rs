//! # Reentrant Owner Lock
//!
//! Mutual exclusion keyed by a caller-supplied [`OwnerToken`] instead of the
//! calling thread. One logical actor (the admission worker, the block-commit
//! path) can re-enter nested calls that take the same coarse lock without
//! deadlocking itself, while different actors are still serialized.
//!
//! ## Semantics
//!
//! - `lock(token)` blocks until the lock is free or already held by `token`.
//! - Re-entry is idempotent: it does not increase the hold count, it only
//!   confirms the existing hold.
//! - `unlock(token)` is called exactly once per logical hold. Calling it from
//!   a non-owner, or when the hold count is already zero, panics.
//!
//! Built from one mutex and one condition variable: waiters sleep on the
//! condvar until the hold count reaches zero, then compete to become owner.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::latency::{LatencyReporter, LockLatencyObserver, NoopLockObserver};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Identity of one logical lock holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken(u64);

impl OwnerToken {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate a token no other `fresh()` call in this process returns.
    pub fn fresh() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// Result of [`ReentrantOwnerLock::lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an Acquired hold must be released with unlock()"]
pub enum Acquisition {
    /// The caller became owner and must call `unlock` once.
    Acquired,
    /// The caller already owned the lock; nothing to release.
    Reentered,
}

#[derive(Debug, Default)]
struct HoldState {
    owner: Option<OwnerToken>,
    hold_count: u32,
    acquired_at: Option<Instant>,
}

/// Coarse-grained lock with owner-token re-entry.
pub struct ReentrantOwnerLock {
    state: Mutex<HoldState>,
    released: Condvar,
    reporter: LatencyReporter,
}

impl ReentrantOwnerLock {
    /// Create an uninstrumented lock.
    pub fn new(name: &'static str) -> Self {
        Self::with_observer(name, Duration::MAX, Arc::new(NoopLockObserver))
    }

    /// Create a lock that reports wait/hold latency and warns past `slow_threshold`.
    pub fn with_observer(
        name: &'static str,
        slow_threshold: Duration,
        observer: Arc<dyn LockLatencyObserver>,
    ) -> Self {
        Self {
            state: Mutex::new(HoldState::default()),
            released: Condvar::new(),
            reporter: LatencyReporter::new(name, slow_threshold, observer),
        }
    }

    pub fn name(&self) -> &'static str {
        self.reporter.name()
    }

    /// Block until `token` owns the lock.
    pub fn lock(&self, token: OwnerToken) -> Acquisition {
        let started = Instant::now();
        let mut state = self.state.lock();

        if state.hold_count > 0 && state.owner == Some(token) {
            return Acquisition::Reentered;
        }

        while state.hold_count > 0 {
            self.released.wait(&mut state);
        }

        state.owner = Some(token);
        state.hold_count = 1;
        state.acquired_at = Some(Instant::now());
        drop(state);

        self.reporter.wait(token, started.elapsed());
        Acquisition::Acquired
    }

    /// Release the hold taken by `token`.
    ///
    /// # Panics
    ///
    /// If the hold count is zero or `token` is not the current owner. Both are
    /// programming errors that would otherwise corrupt the serialization of
    /// the state this lock guards.
    pub fn unlock(&self, token: OwnerToken) {
        let mut state = self.state.lock();

        if state.hold_count == 0 {
            panic!(
                "lock `{}`: unlock by {} with zero hold count",
                self.reporter.name(),
                token
            );
        }
        if state.owner != Some(token) {
            let holder = state.owner;
            drop(state);
            panic!(
                "lock `{}`: unlock by {} but held by {:?}",
                self.reporter.name(),
                token,
                holder
            );
        }

        state.hold_count = 0;
        state.owner = None;
        let acquired_at = state.acquired_at.take();
        drop(state);

        self.released.notify_one();
        if let Some(at) = acquired_at {
            self.reporter.hold(token, at.elapsed());
        }
    }

    /// Scoped hold: releases on drop when this call acquired the lock,
    /// does nothing on drop when it re-entered.
    pub fn hold(&self, token: OwnerToken) -> OwnerGuard<'_> {
        let acquisition = self.lock(token);
        OwnerGuard {
            lock: self,
            token,
            acquisition,
        }
    }

    /// Current owner, if any.
    pub fn holder(&self) -> Option<OwnerToken> {
        let state = self.state.lock();
        if state.hold_count > 0 {
            state.owner
        } else {
            None
        }
    }

    pub fn is_held_by(&self, token: OwnerToken) -> bool {
        self.holder() == Some(token)
    }
}

impl fmt::Debug for ReentrantOwnerLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantOwnerLock")
            .field("name", &self.name())
            .field("holder", &self.holder())
            .finish()
    }
}

/// RAII hold on a [`ReentrantOwnerLock`].
#[must_use = "dropping the guard immediately releases the lock"]
pub struct OwnerGuard<'a> {
    lock: &'a ReentrantOwnerLock,
    token: OwnerToken,
    acquisition: Acquisition,
}

impl OwnerGuard<'_> {
    pub fn token(&self) -> OwnerToken {
        self.token
    }

    /// True when this guard re-entered an existing hold.
    pub fn is_reentrant(&self) -> bool {
        self.acquisition == Acquisition::Reentered
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        if self.acquisition == Acquisition::Acquired {
            self.lock.unlock(self.token);
        }
    }
}
