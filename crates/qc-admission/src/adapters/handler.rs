//! Application handler that forwards admitted transactions to a channel.

use crate::ports::outbound::ApplicationHandler;
use shared_types::SequencedTransaction;
use tokio::sync::mpsc;
use tracing::warn;

/// Forwards each admitted transaction to an unbounded channel.
///
/// Unbounded so the release phase never blocks on a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<SequencedTransaction>,
}

impl ChannelHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SequencedTransaction>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ApplicationHandler for ChannelHandler {
    fn on_admitted(&self, tx: SequencedTransaction) {
        let position = tx.position;
        if self.sender.send(tx).is_err() {
            warn!(position, "Admitted transaction dropped: consumer gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SubmitterId;

    #[test]
    fn test_forwards_in_order() {
        let (handler, mut rx) = ChannelHandler::new();

        handler.on_admitted(SequencedTransaction::new(1, vec![], SubmitterId::new("a")));
        handler.on_admitted(SequencedTransaction::new(2, vec![], SubmitterId::new("a")));

        assert_eq!(rx.try_recv().unwrap().position, 1);
        assert_eq!(rx.try_recv().unwrap().position, 2);
    }

    #[test]
    fn test_closed_consumer_does_not_panic() {
        let (handler, rx) = ChannelHandler::new();
        drop(rx);

        handler.on_admitted(SequencedTransaction::new(1, vec![], SubmitterId::new("a")));
    }
}
