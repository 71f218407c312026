//! # Node Container
//!
//! Holds the shared infrastructure and the admission core, wired together
//! through their ports.

pub mod components;
pub mod config;

pub use components::NodeContainer;
pub use config::{ConfigError, GatewayConfig, NodeConfig, StateHistoryConfig};
