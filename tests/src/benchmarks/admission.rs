//! # Admission Pipeline Benchmarks
//!
//! Workloads:
//! - In-order pushes: every push releases immediately
//! - Reversed pushes: everything buffers until the last push
//! - Shuffled pushes: the common out-of-order case
//! - Snapshot handoff with buffered items behind the baseline
//! - Full path through the ingress queue and the worker thread

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use node_runtime::adapters::CommittedState;
use qc_admission::{
    ingress_channel, AccountDb, AdmissionCore, AdmissionWorker, ApplicationHandler, OwnerToken,
    StateSnapshotApi, TransactionAdmissionApi,
};
use rand::seq::SliceRandom;
use shared_types::{SequencePosition, SequencedTransaction, SubmitterId};

/// Handler that drops everything. Keeps the benchmark on the admission path.
struct SinkHandler;

impl ApplicationHandler for SinkHandler {
    fn on_admitted(&self, tx: SequencedTransaction) {
        black_box(tx);
    }
}

fn core() -> AdmissionCore {
    AdmissionCore::builder(Arc::new(SinkHandler)).build()
}

fn txs(positions: &[SequencePosition]) -> Vec<SequencedTransaction> {
    let submitter = SubmitterId::new("bench");
    positions
        .iter()
        .map(|p| SequencedTransaction::new(*p, vec![0u8; 128], submitter.clone()))
        .collect()
}

fn push_all(batch: Vec<SequencedTransaction>) -> SequencePosition {
    let core = core();
    let owner = OwnerToken::fresh();
    for tx in batch {
        core.push(owner, tx);
    }
    core.ack_cursor().watermark
}

pub fn bench_push_orderings(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission-push");
    group.measurement_time(Duration::from_secs(5));

    for size in [1_000u64, 10_000] {
        let in_order: Vec<_> = (1..=size).collect();
        let reversed: Vec<_> = (1..=size).rev().collect();
        let mut shuffled = in_order.clone();
        shuffled.shuffle(&mut rand::thread_rng());

        group.throughput(Throughput::Elements(size));
        for (name, positions) in [
            ("in_order", &in_order),
            ("reversed", &reversed),
            ("shuffled", &shuffled),
        ] {
            let batch = txs(positions);
            group.bench_with_input(BenchmarkId::new(name, size), &batch, |b, batch| {
                b.iter(|| black_box(push_all(batch.clone())))
            });
        }
    }

    group.finish();
}

pub fn bench_snapshot_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission-snapshot");

    // Half the buffered items sit below the baseline and are discarded,
    // the rest release contiguously.
    for buffered in [100u64, 1_000, 10_000] {
        let batch = txs(&(2..=buffered + 1).collect::<Vec<_>>());
        group.bench_with_input(
            BenchmarkId::new("overtake_buffered", buffered),
            &batch,
            |b, batch| {
                b.iter(|| {
                    let core = core();
                    let owner = OwnerToken::fresh();
                    for tx in batch.clone() {
                        core.push(owner, tx);
                    }
                    let snapshot: Arc<dyn AccountDb> = Arc::new(CommittedState::new([1; 32], 1));
                    black_box(core.set_latest_state_db(owner, snapshot, buffered / 2, 1))
                })
            },
        );
    }

    group.finish();
}

pub fn bench_worker_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission-worker");
    group.sample_size(20);

    let size = 10_000u64;
    let mut positions: Vec<_> = (1..=size).collect();
    positions.shuffle(&mut rand::thread_rng());
    let batch = txs(&positions);

    group.throughput(Throughput::Elements(size));
    group.bench_function("ingress_to_release_shuffled", |b| {
        b.iter(|| {
            let core = Arc::new(core());
            let (sender, receiver) = ingress_channel(1_024).expect("capacity is non-zero");
            let worker = AdmissionWorker::new(core.clone(), receiver)
                .spawn("admission-bench")
                .expect("spawn worker");
            for tx in batch.clone() {
                sender.blocking_send(tx).expect("worker alive");
            }
            drop(sender);
            black_box(worker.join())
        })
    });

    group.finish();
}
