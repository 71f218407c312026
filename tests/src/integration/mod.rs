//! # Integration Tests
//!
//! Flows that cross the admission core, the node runtime and the event bus.

mod concurrency;
mod pipeline;
mod properties;
