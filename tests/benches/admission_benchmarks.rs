//! # Quantum-Chain Admission Benchmarks
//!
//! | Workload | Claim |
//! |----------|-------|
//! | In-order push | O(log n) per push, immediate release |
//! | Shuffled push | O(log n) per push amortized over the release |
//! | Snapshot handoff | Linear in items overtaken by the baseline |
//! | Worker throughput | Ingress queue does not dominate release cost |

use criterion::{criterion_group, criterion_main};
use qc_tests::benchmarks::admission::{
    bench_push_orderings, bench_snapshot_handoff, bench_worker_throughput,
};

criterion_group!(
    admission_benches,
    bench_push_orderings,
    bench_snapshot_handoff,
    bench_worker_throughput
);
criterion_main!(admission_benches);
