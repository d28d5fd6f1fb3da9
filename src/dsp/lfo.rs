//! Control-rate low frequency oscillator.

use rand::{rngs::SmallRng, Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running at sub-audio frequencies. Here it runs at
CONTROL RATE: one value per processing block, not one per sample.

Vocabulary
----------

  control-rate    One update per block (every 64 frames at most here).
                  Cheap, and at LFO speeds the stepping is inaudible once
                  the value has gone through a parameter smoother.

  bipolar         Output swings -1.0 to +1.0, scaled by depth.

  speed           A 0-1 control mapped exponentially onto frequency, so the
                  slow end resolves multi-second sweeps:

                    speed   frequency
                    0.0     0.05 Hz   (20 s cycle)
                    0.5     ~0.71 Hz
                    1.0     10 Hz


Waveforms
---------

SINE
    Polynomial approximation of sin(2π·phase). A parabola with one
    correction term; peak error ~0.1%, never leaves [-1, 1].

RAMP
    Descending: +1 at phase 0, -1 just before the wrap.

    ╲ ╲ ╲ ╲

RANDOM
    A new random target on every cycle, linearly interpolated from the
    previous one across the cycle. Smooth wandering rather than stepping
    sample & hold.


Phase Advance
-------------

Each block, phase moves by frequency × frames / sample_rate. The block
length is passed in by the caller so partial blocks advance correctly.
*/

/// Slowest LFO frequency in Hz.
pub const MIN_FREQUENCY_HZ: f32 = 0.05;
/// Fastest LFO frequency in Hz.
pub const MAX_FREQUENCY_HZ: f32 = 10.0;

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Map a 0-1 speed control onto [`MIN_FREQUENCY_HZ`, `MAX_FREQUENCY_HZ`].
#[inline]
pub fn speed_to_frequency(speed: f32) -> f32 {
    let speed = speed.clamp(0.0, 1.0);
    MIN_FREQUENCY_HZ * (MAX_FREQUENCY_HZ / MIN_FREQUENCY_HZ).powf(speed)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Ramp,
    Random,
}

impl LfoWaveform {
    pub const COUNT: usize = 3;

    /// Waveform for a raw parameter value (wraps).
    pub fn from_index(index: i32) -> Self {
        match index.rem_euclid(Self::COUNT as i32) {
            0 => LfoWaveform::Sine,
            1 => LfoWaveform::Ramp,
            _ => LfoWaveform::Random,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LfoWaveform::Sine => "SINE",
            LfoWaveform::Ramp => "SAW",
            LfoWaveform::Random => "RANDOM",
        }
    }
}

/// sin(2π·phase) for phase in [0, 1).
#[inline]
fn sine_approx(phase: f32) -> f32 {
    // sin(2πp) = -sin(πt) with t = 2p - 1
    let t = 2.0 * phase - 1.0;
    let y = 4.0 * t * (1.0 - t.abs());
    -(y + 0.225 * (y * y.abs() - y))
}

pub struct Lfo {
    phase: f32,
    frequency: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
    depth: f32,
    current_random: f32,
    next_random: f32,
    rng: SmallRng,
}

impl Lfo {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let next_random = rng.gen_range(-1.0..=1.0);
        Self {
            phase: 0.0,
            frequency: 1.0,
            sample_rate,
            waveform: LfoWaveform::Sine,
            depth: 0.0,
            current_random: 0.0,
            next_random,
            rng,
        }
    }

    /// Restart the cycle. Random targets keep drawing from the same stream.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.current_random = 0.0;
        self.next_random = self.rng.gen_range(-1.0..=1.0);
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency = frequency_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
    }

    /// Set frequency from a 0-1 speed control (exponential mapping).
    pub fn set_speed(&mut self, speed: f32) {
        self.set_frequency(speed_to_frequency(speed));
    }

    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Current depth-scaled output without advancing.
    pub fn value(&self) -> f32 {
        let raw = match self.waveform {
            LfoWaveform::Sine => sine_approx(self.phase),
            LfoWaveform::Ramp => 1.0 - 2.0 * self.phase,
            LfoWaveform::Random => {
                self.current_random + (self.next_random - self.current_random) * self.phase
            }
        };
        raw * self.depth
    }

    /// Return this block's output, then advance phase by `frames` samples.
    pub fn process(&mut self, frames: usize) -> f32 {
        let output = self.value();

        self.phase += self.frequency * frames as f32 / self.sample_rate;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            if self.waveform == LfoWaveform::Random {
                self.current_random = self.next_random;
                self.next_random = self.rng.gen_range(-1.0..=1.0);
            }
        }

        output
    }
}
