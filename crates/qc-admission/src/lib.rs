//! # Sequenced Transaction Admission
//!
//! Sits between the gateway and the application. The gateway delivers
//! transactions stamped with a sequence position, possibly out of order and
//! possibly repeated. This crate buffers them, releases them to the
//! application strictly in position order, and keeps the release watermark
//! consistent with block commits and the current state snapshot.
//!
//! ## Flow
//!
//! ```text
//! gateway ──► IngressSender ──(bounded queue)──► AdmissionWorker ──► AdmissionCore ──► ApplicationHandler
//!                                                                        ▲
//! block commit ──► set_latest_state_db(snapshot, baseline, height) ──────┘
//!                                                                        │
//!                                              ack cursor (watch) ◄─────┘
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Released positions are strictly increasing (excluding position 0) | `domain/heap.rs` - `release()` |
//! | Watermark never decreases | `domain/heap.rs` - `set_threshold()` ignores regressions |
//! | Positions at or below the watermark are never released | `domain/heap.rs` - stale check in `push()` and phase A |
//! | Same position buffered at most once | `domain/heap.rs` - `buffered` membership set |
//! | Snapshot never regresses behind the watermark | `domain/snapshot.rs` - `offer()` |
//! | One logical actor mutates at a time | `application/service.rs` - owner lock held per operation |
//!
//! ## Locking
//!
//! All state lives behind one [`ReentrantOwnerLock`]. Each operation takes an
//! [`OwnerToken`]; a caller already holding the lock re-enters without
//! blocking, so `set_latest_state_db` can call `get_threshold` and
//! `set_threshold` as plain nested calls. Releasing a lock that another token
//! holds, or releasing it with no hold, panics.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/     - bounded ingress queue, channel-backed handler
//! application/  - AdmissionCore (lock domain), AdmissionWorker (drain thread)
//! ports/        - TransactionAdmissionApi, StateSnapshotApi, outbound SPI
//! domain/       - AdmissionHeap, SnapshotSlot, value objects, errors
//! lock/         - ReentrantOwnerLock with latency reporting
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod lock;
pub mod ports;

pub use adapters::{ingress_channel, ChannelHandler, IngressReceiver, IngressSender};
pub use application::{
    AdmissionCore, AdmissionCoreBuilder, AdmissionWorker, WorkerHandle, WorkerReport,
    ADMISSION_LOCK,
};
pub use config::{AdmissionConfig, DEFAULT_INGRESS_CAPACITY};
pub use domain::{
    AdmissionError, AdmissionHeap, AdmissionStats, PushOutcome, ReleaseSummary,
    SnapshotDecision, SnapshotSlot,
};
pub use lock::{Acquisition, OwnerGuard, OwnerToken, ReentrantOwnerLock};
pub use ports::*;
