//! Benchmarks for the dual-grain pitch shifter.

use std::hint::black_box;

use cloudverb::fx::{PitchShifter, Stage};
use criterion::{BenchmarkId, Criterion};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_pitch_shifter(c: &mut Criterion) {
    let mut group = c.benchmark_group("fx/pitch_shifter");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut block = input.clone();

        for (name, semitones) in [("octave_up", 12.0), ("fifth_down", -7.0)] {
            let Ok(mut shifter) = PitchShifter::new() else {
                return;
            };
            shifter.set_amount(1.0);
            shifter.set_pitch(semitones);
            shifter.settle_window();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    block.copy_from_slice(&input);
                    shifter.render_block(black_box(&mut block));
                })
            });
        }
    }

    group.finish();
}
