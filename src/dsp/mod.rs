//! Allocation-free DSP primitives shared by the effect stages.

/// Quantized delay memory carved into fixed delay lines.
pub mod arena;
/// Control-rate LFO with sine, ramp and smoothed-random shapes.
pub mod lfo;
pub mod math;
/// Sample storage formats for delay memory.
pub mod quantize;
/// One-pole parameter smoothing.
pub mod smoother;

pub use arena::{DelayArena, DelayLine};
pub use lfo::{Lfo, LfoWaveform};
pub use quantize::{Fixed12, Fixed16, Float, SampleFormat};
pub use smoother::{SmoothedParam, SmootherBank};
