//! Benchmarks for the full pipeline as a host would drive it.

use std::hint::black_box;

use cloudverb::{ParamId, Pipeline};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

/// Every stage running and both LFOs modulating: the worst case per block.
fn everything_on() -> Option<Pipeline> {
    let mut pipeline = Pipeline::default();
    for (id, value) in [
        (ParamId::Texture, 100),
        (ParamId::GrainAmount, 127),
        (ParamId::GrainDensity, 127),
        (ParamId::ShiftAmount, 90),
        (ParamId::ShiftPitch, 76),
        (ParamId::Lfo1Destination, 2),
        (ParamId::Lfo1Depth, 80),
        (ParamId::Lfo2Destination, 15),
        (ParamId::Lfo2Depth, 127),
    ] {
        pipeline.set_parameter(id as u8, value);
    }
    pipeline.init().ok()?;
    Some(pipeline)
}

pub fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/pipeline");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size * 2).map(|i| (i as f32 * 0.02).sin() * 0.3).collect();
        let mut output = vec![0.0f32; size * 2];

        let mut pipeline = Pipeline::default();
        if pipeline.init().is_err() {
            return;
        }
        group.bench_with_input(BenchmarkId::new("init_preset", size), &size, |b, &size| {
            b.iter(|| pipeline.process(black_box(&input), &mut output, size, 2, 2))
        });

        let Some(mut pipeline) = everything_on() else {
            return;
        };
        group.bench_with_input(BenchmarkId::new("everything_on", size), &size, |b, &size| {
            b.iter(|| pipeline.process(black_box(&input), &mut output, size, 2, 2))
        });
    }

    group.finish();
}
