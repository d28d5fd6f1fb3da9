//! The effect stages of the chain.
//!
//! Every stage processes a block of stereo frames in place, so the pipeline
//! can hand the same working buffer from one stage to the next. Stages own
//! all of their memory; nothing is allocated after construction.

/// Griesinger/Dattorro style plate reverb on 12-bit delay memory.
pub mod reverb;
/// Feed-forward allpass smearing ("texture").
pub mod diffuser;
/// Stochastic micro-grains over a short circular buffer, with freeze.
pub mod granular;
/// Two crossfaded read heads over a delay history.
pub mod pitch_shifter;

pub use diffuser::TextureDiffuser;
pub use granular::GrainCloud;
pub use pitch_shifter::PitchShifter;
pub use reverb::DiffusionReverb;

use crate::ACTIVE_THRESHOLD;

/// One stereo sample pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    pub l: f32,
    pub r: f32,
}

impl Frame {
    pub const SILENCE: Frame = Frame { l: 0.0, r: 0.0 };

    pub fn new(l: f32, r: f32) -> Self {
        Self { l, r }
    }

    pub fn mono(sample: f32) -> Self {
        Self { l: sample, r: sample }
    }
}

/// Core trait for the processing stages of the chain.
pub trait Stage: Send {
    /// Process `frames` in place.
    fn render_block(&mut self, frames: &mut [Frame]);

    /// Forget all audio history (delay memory, filter state, grains).
    fn clear(&mut self);

    /// Dry/wet amount currently in effect.
    fn amount(&self) -> f32;

    /// Whether the stage does audible work at its current amount.
    ///
    /// The pipeline skips inactive stages entirely.
    fn is_active(&self) -> bool {
        self.amount() > ACTIVE_THRESHOLD
    }
}
