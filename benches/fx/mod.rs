//! Benchmarks for individual effect stages.

mod diffuser;
mod granular;
mod pitch_shifter;
mod reverb;

pub use diffuser::bench_diffuser;
pub use granular::bench_granular;
pub use pitch_shifter::bench_pitch_shifter;
pub use reverb::bench_reverb;
