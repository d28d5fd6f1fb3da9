//! Benchmarks for the texture diffuser.

use std::hint::black_box;

use cloudverb::fx::{Stage, TextureDiffuser};
use criterion::{BenchmarkId, Criterion};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_diffuser(c: &mut Criterion) {
    let mut group = c.benchmark_group("fx/diffuser");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut block = input.clone();

        let Ok(mut diffuser) = TextureDiffuser::new() else {
            return;
        };
        diffuser.set_amount(1.0);
        group.bench_with_input(BenchmarkId::new("full", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                diffuser.render_block(black_box(&mut block));
            })
        });
    }

    group.finish();
}
