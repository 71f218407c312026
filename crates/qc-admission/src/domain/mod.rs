//! Domain module for the Admission Pipeline
//!
//! Contains the reordering heap, the snapshot slot, value objects and errors.
//! Nothing here is thread-safe on its own; `application::service` provides
//! the locking.

pub mod errors;
pub mod heap;
pub mod snapshot;
pub mod value_objects;

pub use errors::*;
pub use heap::AdmissionHeap;
pub use snapshot::SnapshotSlot;
pub use value_objects::*;
