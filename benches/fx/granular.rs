//! Benchmarks for the grain cloud.

use std::hint::black_box;

use cloudverb::fx::{GrainCloud, Stage};
use criterion::{BenchmarkId, Criterion};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_granular(c: &mut Criterion) {
    let mut group = c.benchmark_group("fx/granular");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut block = input.clone();

        // Dense cloud: grains spawn almost every block and stay long
        let mut cloud = GrainCloud::new(1);
        cloud.set_amount(1.0);
        cloud.set_density(1.0);
        cloud.set_size(1.0);
        cloud.set_pitch(7.0);
        group.bench_with_input(BenchmarkId::new("dense", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                cloud.render_block(black_box(&mut block));
            })
        });

        let mut cloud = GrainCloud::new(1);
        cloud.set_amount(1.0);
        cloud.set_density(1.0);
        cloud.render_block(&mut block);
        cloud.set_freeze(true);
        group.bench_with_input(BenchmarkId::new("frozen", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                cloud.render_block(black_box(&mut block));
            })
        });
    }

    group.finish();
}
