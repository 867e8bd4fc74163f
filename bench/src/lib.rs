//! Benchmark utilities for the ECS crate.
//!
//! This crate provides the supporting types for `cargo bench -p rusty_bench`:
//!
//! - **Components**: a handful of representative component types used across
//!   the microbenchmarks (spawn, iterate, migrate, despawn).
//! - **Memory tracking**: heap allocation profiling via dhat, gated behind
//!   the `memory_profiling` feature.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_bench -- spawn
//!
//! # Run with memory profiling (slower)
//! cargo bench -p rusty_bench --features memory_profiling
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for
//! visualization. Memory profiling results are written to `dhat-heap.json`.

pub mod components;
pub mod memory;
