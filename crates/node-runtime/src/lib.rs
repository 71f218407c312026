//! # Node Runtime Library
//!
//! Wires the sequenced admission pipeline into a running node. The main
//! entry point is the `main.rs` binary; the library is exposed for tests.
//!
//! ## Flow
//!
//! ```text
//! Gateway ──submit──→ GatewayIngressAdapter ──bounded queue──→ AdmissionWorker (OS thread)
//!                                                                  │ push
//!                                                                  ↓
//! Event Bus ──BlockCommitted──→ BlockCommitHandler ──set_latest_state_db──→ AdmissionCore
//!                                                                  │
//!                        ┌─────────────────────────────────────────┤
//!                        ↓ on_admitted                             ↓ ack cursor
//!               BusAdmissionHandler ──→ application          AckForwarder ──→ Gateway
//! ```
//!
//! ## Modules
//!
//! - `adapters/` - Port implementations (state history, gateway, metrics, bus)
//! - `container/` - Configuration and dependency injection
//! - `handlers/` - Block-commit handler and ack forwarder tasks
//! - `runtime` - Startup and graceful shutdown

#![allow(missing_docs)]
#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, NodeContainer};
pub use runtime::NodeRuntime;
