//! # Quantum-Chain Node Runtime
//!
//! Starts the admission pipeline with telemetry, runs until Ctrl+C, then
//! drains ingress and shuts down.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use qc_admission::ChannelHandler;
use tracing::{debug, info, warn};

use node_runtime::adapters::LoggingGatewayTransport;
use node_runtime::{NodeConfig, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env();
    config.validate().context("Invalid configuration")?;

    let telemetry = quantum_telemetry::init_telemetry(config.telemetry.clone())
        .await
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Quantum-Chain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Sequenced transaction admission");
    info!("===========================================");

    // Admitted transactions are only logged until an execution engine is attached.
    let (application, mut admitted) = ChannelHandler::new();
    let consumer = tokio::spawn(async move {
        while let Some(tx) = admitted.recv().await {
            debug!(
                position = tx.position,
                submitter = %tx.submitter.as_str(),
                bytes = tx.payload.len(),
                "Transaction admitted"
            );
        }
    });

    let runtime = NodeRuntime::new(
        config,
        Arc::new(application),
        Arc::new(LoggingGatewayTransport),
    )?;
    let _ingress = runtime.start().context("Failed to start node runtime")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    let report = runtime.shutdown().await?;
    info!(
        received = report.received,
        dispatched = report.dispatched,
        stale = report.stale,
        duplicate = report.duplicate,
        "Admission worker report"
    );
    match telemetry.metrics_snapshot() {
        Ok(metrics) => debug!(%metrics, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to encode final metrics"),
    }

    // The application channel closes once the admission core is dropped.
    drop(runtime);
    let _ = tokio::time::timeout(Duration::from_secs(1), consumer).await;
    Ok(())
}
