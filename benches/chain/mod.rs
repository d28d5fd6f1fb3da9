//! Benchmarks for the complete effect chain.

mod pipeline;

pub use pipeline::bench_pipeline;
