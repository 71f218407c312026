//! Owner-token locking shared by the admission worker and the block-commit path.

pub mod latency;
pub mod owner_lock;

pub use latency::{LockLatencyObserver, NoopLockObserver};
pub use owner_lock::{Acquisition, OwnerGuard, OwnerToken, ReentrantOwnerLock};
