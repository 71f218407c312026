//! Application layer for the Admission Pipeline

pub mod service;
pub mod worker;

pub use service::{AdmissionCore, AdmissionCoreBuilder, ADMISSION_LOCK};
pub use worker::{AdmissionWorker, WorkerHandle, WorkerReport};
