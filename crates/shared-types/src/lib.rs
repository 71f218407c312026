//! # Shared Types Crate
//!
//! This crate contains the entities exchanged between the gateway transport,
//! the admission pipeline, the event bus and the block-commit path.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Opaque Payloads**: Transactions are carried as bytes; decoding belongs
//!   to the execution engine.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
