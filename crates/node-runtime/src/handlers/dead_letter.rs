//! # Dead Letter Monitor
//!
//! Drains the dead letter topic so every `CriticalError` reaches the node
//! log under one component, whichever component emitted it. Counting is
//! left to the emitter.

use quantum_telemetry::log_event;
use shared_bus::{BlockchainEvent, EventStream};
use tokio_stream::StreamExt;
use tracing::info;

pub struct DeadLetterMonitor {
    stream: EventStream,
    seen: u64,
}

impl DeadLetterMonitor {
    pub fn new(stream: EventStream) -> Self {
        Self { stream, seen: 0 }
    }

    /// Log critical errors until the bus closes. Returns how many were seen.
    pub async fn run(mut self) -> u64 {
        while let Some(event) = self.stream.next().await {
            if let BlockchainEvent::CriticalError { component, error } = event {
                self.seen += 1;
                log_event!(error, "dead-letter", "Critical error", source = %component, error = %error);
            }
        }

        info!(seen = self.seen, "Event bus closed, dead letter monitor stopping");
        self.seen
    }
}
