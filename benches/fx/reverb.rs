//! Benchmarks for the plate reverb.

use std::hint::black_box;

use cloudverb::fx::{DiffusionReverb, Stage};
use criterion::{BenchmarkId, Criterion};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("fx/reverb");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut block = input.clone();

        let Ok(mut reverb) = DiffusionReverb::new() else {
            return;
        };
        reverb.set_amount(0.5);
        reverb.set_time(0.55);
        group.bench_with_input(BenchmarkId::new("default", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                reverb.render_block(black_box(&mut block));
            })
        });

        // Longest tail, most diffusion
        let Ok(mut reverb) = DiffusionReverb::new() else {
            return;
        };
        reverb.set_amount(1.0);
        reverb.set_time(0.99);
        reverb.set_diffusion(0.75);
        group.bench_with_input(BenchmarkId::new("long_tail", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                reverb.render_block(black_box(&mut block));
            })
        });
    }

    group.finish();
}
