//! # Quantum-Chain Benchmarks
//!
//! Workloads for the admission pipeline. Registered with criterion in
//! `benches/admission_benchmarks.rs`.

pub mod admission;
