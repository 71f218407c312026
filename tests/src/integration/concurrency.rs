//! # Concurrency Tests
//!
//! The admission worker runs on its own OS thread while block commit hands
//! over snapshots from another. These tests race the two and check that
//! ordering and accounting hold.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use node_runtime::adapters::{CommittedState, InMemoryStateHistory};
    use qc_admission::{
        ingress_channel, AccountDb, AdmissionCore, AdmissionWorker, ChannelHandler, OwnerToken,
        StateSnapshotApi, TransactionAdmissionApi,
    };
    use rand::seq::SliceRandom;
    use rand::Rng;
    use shared_types::{SequencePosition, SequencedTransaction, SubmitterId};
    use tokio::sync::mpsc::UnboundedReceiver;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Harness {
        core: Arc<AdmissionCore>,
        admitted: UnboundedReceiver<SequencedTransaction>,
        history: Arc<InMemoryStateHistory>,
    }

    fn harness() -> Harness {
        let history = Arc::new(InMemoryStateHistory::new(64));
        let (handler, admitted) = ChannelHandler::new();
        let core = Arc::new(
            AdmissionCore::builder(Arc::new(handler))
                .with_history(history.clone())
                .build(),
        );
        Harness {
            core,
            admitted,
            history,
        }
    }

    fn tx(position: SequencePosition) -> SequencedTransaction {
        SequencedTransaction::new(position, vec![], SubmitterId::new("gateway"))
    }

    fn drain(admitted: &mut UnboundedReceiver<SequencedTransaction>) -> Vec<SequencePosition> {
        let mut positions = Vec::new();
        while let Ok(tx) = admitted.try_recv() {
            positions.push(tx.position);
        }
        positions
    }

    fn shuffled_chunks(total: u64, chunks: usize) -> Vec<Vec<SequencePosition>> {
        let mut positions: Vec<_> = (1..=total).collect();
        positions.shuffle(&mut rand::thread_rng());
        let size = (positions.len() + chunks - 1) / chunks;
        positions.chunks(size).map(<[u64]>::to_vec).collect()
    }

    // =============================================================================
    // WORKER THREAD vs. BLOCK COMMIT THREAD
    // =============================================================================

    /// Baselines that trail the watermark never discard anything: every
    /// submitted position comes out exactly once, in order.
    #[test]
    fn test_trailing_baselines_release_everything_in_order() {
        const TOTAL: u64 = 4_000;
        let Harness {
            core,
            mut admitted,
            history,
        } = harness();
        let (sender, receiver) = ingress_channel(256).unwrap();
        let worker = AdmissionWorker::new(core.clone(), receiver)
            .spawn("admission-it")
            .unwrap();

        thread::scope(|s| {
            for chunk in shuffled_chunks(TOTAL, 4) {
                let sender = sender.clone();
                s.spawn(move || {
                    for position in chunk {
                        sender.blocking_send(tx(position)).unwrap();
                    }
                });
            }

            let core = Arc::clone(&core);
            let history = Arc::clone(&history);
            s.spawn(move || {
                let committer = OwnerToken::fresh();
                for height in 1..=50u64 {
                    let baseline = core.ack_cursor().watermark;
                    let snapshot: Arc<dyn AccountDb> =
                        Arc::new(CommittedState::new([height as u8; 32], height));
                    history.record(Arc::clone(&snapshot));
                    core.set_latest_state_db(committer, snapshot, baseline, height);
                    thread::yield_now();
                }
            });
        });
        drop(sender);
        let report = worker.join();

        assert_eq!(report.received, TOTAL);
        assert_eq!(report.dispatched, TOTAL);
        assert_eq!(drain(&mut admitted), (1..=TOTAL).collect::<Vec<_>>());

        let observer = OwnerToken::fresh();
        assert_eq!(core.ack_cursor().watermark, TOTAL);
        assert_eq!(core.latest_height(observer), Some(50));
        assert!(core.get_account_db_by_hash(&[50; 32]).is_some());
    }

    /// Baselines that jump ahead discard what they overtake. Whatever is
    /// released stays strictly increasing and every item is accounted for.
    #[test]
    fn test_leading_baselines_keep_order_and_accounting() {
        const TOTAL: u64 = 3_000;
        let Harness {
            core, mut admitted, ..
        } = harness();
        let (sender, receiver) = ingress_channel(128).unwrap();
        let worker = AdmissionWorker::new(core.clone(), receiver)
            .spawn("admission-it-leading")
            .unwrap();

        thread::scope(|s| {
            for chunk in shuffled_chunks(TOTAL, 3) {
                let sender = sender.clone();
                s.spawn(move || {
                    for position in chunk {
                        sender.blocking_send(tx(position)).unwrap();
                    }
                });
            }

            let core = Arc::clone(&core);
            s.spawn(move || {
                let committer = OwnerToken::fresh();
                let mut rng = rand::thread_rng();
                for height in 1..=40u64 {
                    let baseline = core.ack_cursor().watermark + rng.gen_range(0..25);
                    let snapshot: Arc<dyn AccountDb> =
                        Arc::new(CommittedState::new([height as u8; 32], height));
                    core.set_latest_state_db(committer, snapshot, baseline, height);
                    thread::yield_now();
                }
            });
        });
        drop(sender);
        let report = worker.join();

        let released = drain(&mut admitted);
        assert!(released.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(released.len() as u64, report.dispatched);

        let stats = core.stats(OwnerToken::fresh());
        assert_eq!(report.received, TOTAL);
        assert_eq!(
            stats.admitted + stats.stale_discarded + stats.duplicate_discarded
                + stats.buffered as u64,
            TOTAL
        );
        assert_eq!(stats.duplicate_discarded, 0);
        assert_eq!(core.ack_cursor().watermark, stats.watermark);
    }

    /// Two producers submitting the same positions: each position is
    /// released once, the copy is dropped as stale or duplicate.
    #[test]
    fn test_replayed_positions_released_once() {
        const TOTAL: u64 = 1_000;
        let Harness {
            core, mut admitted, ..
        } = harness();
        let (sender, receiver) = ingress_channel(64).unwrap();
        let worker = AdmissionWorker::new(core.clone(), receiver)
            .spawn("admission-it-replay")
            .unwrap();

        thread::scope(|s| {
            for _ in 0..2 {
                let sender = sender.clone();
                s.spawn(move || {
                    for position in (1..=TOTAL).rev() {
                        sender.blocking_send(tx(position)).unwrap();
                    }
                });
            }
        });
        drop(sender);
        let report = worker.join();

        assert_eq!(drain(&mut admitted), (1..=TOTAL).collect::<Vec<_>>());
        assert_eq!(report.received, 2 * TOTAL);
        assert_eq!(report.dispatched, TOTAL);
        assert_eq!(report.stale + report.duplicate, TOTAL);
    }
}
