//! # Event Handlers
//!
//! Long-running tasks that react to bus events and admission progress.

pub mod ack_forwarder;
pub mod block_commit;
pub mod dead_letter;

pub use ack_forwarder::AckForwarder;
pub use block_commit::BlockCommitHandler;
pub use dead_letter::DeadLetterMonitor;
