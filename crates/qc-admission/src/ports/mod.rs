//! Ports module for the Admission Pipeline
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::{StateSnapshotApi, TransactionAdmissionApi};
pub use outbound::{
    AccountDb, AdmissionMetrics, ApplicationHandler, LockLatencyObserver, NoStateHistory,
    NoopAdmissionMetrics, NoopLockObserver, StateHistory,
};
