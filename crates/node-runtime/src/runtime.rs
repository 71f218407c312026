//! # Node Runtime
//!
//! Owns the admission worker thread and the async handler tasks.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration and build the container
//! 2. Create the bounded ingress queue
//! 3. Spawn the admission worker on its own OS thread
//! 4. Spawn the block-commit handler, the ack forwarder and the dead
//!    letter monitor
//! 5. Hand the gateway its ingress adapter
//!
//! ## Shutdown Sequence
//!
//! 1. Close ingress so the worker drains and exits
//! 2. Join the worker
//! 3. Send the final ack cursor
//! 4. Signal the handler tasks and wait for them (with timeout)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use parking_lot::{Mutex, RwLock};
use qc_admission::{
    ingress_channel, AdmissionCore, AdmissionWorker, ApplicationHandler, TransactionAdmissionApi,
    WorkerHandle,
    WorkerReport,
};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
use shared_types::NodeState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::{GatewayIngressAdapter, GatewayTransport};
use crate::container::{NodeConfig, NodeContainer};
use crate::handlers::{AckForwarder, BlockCommitHandler, DeadLetterMonitor};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The running node: admission worker plus event handlers.
pub struct NodeRuntime {
    container: Arc<NodeContainer>,
    transport: Arc<dyn GatewayTransport>,
    state: RwLock<NodeState>,
    ingress: Mutex<Option<GatewayIngressAdapter>>,
    worker: Mutex<Option<WorkerHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeRuntime {
    pub fn new(
        config: NodeConfig,
        application: Arc<dyn ApplicationHandler>,
        transport: Arc<dyn GatewayTransport>,
    ) -> Result<Self> {
        config.validate().context("Invalid node configuration")?;

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            container: Arc::new(NodeContainer::new(config, application)),
            transport,
            state: RwLock::new(NodeState::Starting),
            ingress: Mutex::new(None),
            worker: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
        })
    }

    /// Start the worker and the handlers. Returns the adapter the gateway
    /// submits through.
    pub fn start(&self) -> Result<GatewayIngressAdapter> {
        if self.state() != NodeState::Starting {
            bail!("Node runtime already started ({:?})", self.state());
        }

        let config = &self.container.config;
        let admission = self.container.admission();
        let bus = self.container.event_bus();

        let (sender, receiver) = ingress_channel(config.admission.ingress_capacity)
            .context("Failed to create ingress queue")?;
        let worker = AdmissionWorker::new(admission.clone(), receiver)
            .with_metrics(self.container.metrics.clone())
            .spawn(&config.admission.worker_thread_name)
            .context("Failed to spawn admission worker")?;
        *self.worker.lock() = Some(worker);

        // Subscribe before returning so no commit published after start is missed.
        let block_commit = BlockCommitHandler::new(
            bus.subscribe(EventFilter::topics(vec![EventTopic::BlockCommit])),
            admission.clone(),
            Arc::clone(&self.container.state_history),
            Arc::clone(&bus),
        );
        let ack_forwarder = AckForwarder::new(
            admission.subscribe_acks(),
            Arc::clone(&self.transport),
            Arc::clone(&bus),
        );

        let dead_letters = DeadLetterMonitor::new(
            bus.event_stream(EventFilter::topics(vec![EventTopic::DeadLetterQueue])),
        );

        let mut tasks = self.tasks.lock();
        let mut shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = block_commit.run() => {}
                _ = shutdown.changed() => {
                    info!("[block-commit] Shutdown signal received");
                }
            }
        }));
        let mut shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = ack_forwarder.run() => {}
                _ = shutdown.changed() => {
                    info!("[gateway] Shutdown signal received");
                }
            }
        }));
        let mut shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = dead_letters.run() => {}
                _ = shutdown.changed() => {
                    info!("[dead-letter] Shutdown signal received");
                }
            }
        }));
        drop(tasks);

        let adapter = GatewayIngressAdapter::new(sender);
        *self.ingress.lock() = Some(adapter.clone());
        *self.state.write() = NodeState::Running;

        info!(
            network = %config.gateway.network,
            ingress_capacity = config.admission.ingress_capacity,
            watermark = admission.ack_cursor().watermark,
            "Node runtime started"
        );
        Ok(adapter)
    }

    /// Drain ingress, stop the worker and the handlers.
    ///
    /// Everything queued before the call is pushed through admission before
    /// the worker exits. Calling this again after it returns is a no-op.
    pub async fn shutdown(&self) -> Result<WorkerReport> {
        info!("Initiating graceful shutdown...");
        *self.state.write() = NodeState::ShuttingDown;

        if let Some(ingress) = self.ingress.lock().take() {
            ingress.close();
        }

        let worker = self.worker.lock().take();
        let report = match worker {
            Some(worker) => match tokio::task::spawn_blocking(move || worker.join()).await {
                Ok(report) => report,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => return Err(e).context("Admission worker join cancelled"),
            },
            None => WorkerReport::default(),
        };

        let final_ack = AckForwarder::new(
            self.container.admission.subscribe_acks(),
            Arc::clone(&self.transport),
            self.container.event_bus(),
        );
        if let Err(e) = final_ack.flush().await {
            warn!(error = %e, "Final acknowledgement not delivered");
        }

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Ok(Err(e)) => warn!(error = %e, "Handler task cancelled"),
                Err(_) => warn!("Handler task did not stop within {:?}", SHUTDOWN_GRACE),
            }
        }

        *self.state.write() = NodeState::Stopped;
        info!(
            received = report.received,
            dispatched = report.dispatched,
            watermark = self.container.admission.ack_cursor().watermark,
            "Shutdown complete"
        );
        Ok(report)
    }

    pub fn state(&self) -> NodeState {
        *self.state.read()
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.container.event_bus()
    }

    pub fn admission(&self) -> Arc<AdmissionCore> {
        self.container.admission()
    }

    pub fn container(&self) -> Arc<NodeContainer> {
        Arc::clone(&self.container)
    }
}
