//! Benchmarks for the effect stages and the full chain.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - fx/*     One stage at a time
//!   - chain/*  The whole pipeline, interleaved in and out

use criterion::{criterion_group, criterion_main};

mod chain;
mod fx;

/// Common host buffer sizes.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

/// Quiet broadband test signal, one stereo frame per entry.
pub fn test_signal(size: usize) -> Vec<cloudverb::Frame> {
    (0..size)
        .map(|i| {
            let t = i as f32;
            cloudverb::Frame::new((t * 0.05).sin() * 0.3, (t * 0.031).sin() * 0.3)
        })
        .collect()
}

criterion_group!(
    benches,
    fx::bench_reverb,
    fx::bench_diffuser,
    fx::bench_granular,
    fx::bench_pitch_shifter,
    chain::bench_pipeline,
);
criterion_main!(benches);
