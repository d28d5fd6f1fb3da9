use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    dsp::math::{sanitize, semitones_to_ratio, smoothstep, soft_clip},
    fx::{Frame, Stage},
    ACTIVE_THRESHOLD, MAX_BLOCK_SIZE,
};

/*
Grain Cloud
===========

A short circular stereo buffer (2048 frames, ~43 ms) that is continuously
overwritten with the incoming signal, and a fixed pool of 8 grains that
replay slices of it.

    write head ──►
    ┌──────────────────────────────────────────────┐
    │ ...older audio...          ▓▓▓grain▓▓▓  │new │
    └──────────────────────────────────────────────┘
                                 ◄── offset ──►

Vocabulary
----------

  position    0.0 reads just behind the write head (most recent audio),
              1.0 reads as far back as the buffer allows.

  size        Grain length, 240..1920 samples (5..40 ms).

  density     Spawn rate. Squared, so the low half of the knob stays sparse:
              0 → one grain every ten grain lengths, 1 → four per length.

  pitch       Playback rate of new grains in semitones. A grain keeps the
              rate it was born with.

  freeze      Stop writing. Grains keep reading the frozen buffer, so the
              last 43 ms loop as a texture.


Scheduling
----------

Once per block a single random draw decides whether a grain is born:

    p = max(density² × 4, 0.1) × block_len / grain_size

The new grain takes the FIRST inactive slot. The scan is linear over eight
slots; a pool this small doesn't need a free list. When all eight are busy
the spawn is dropped.


Grain Playback
--------------

Each grain reads with a 16.16 fixed-point phase (65536 = one sample), so the
integer part indexes the buffer and the low 16 bits interpolate. Its
envelope runs a triangle 0 → 1 → 0 over the grain length, shaped by
smoothstep into a bell close to a Hann window. The grain dies when the
envelope completes or the phase runs past its length, whichever comes
first.

The grain sum is soft clipped before the dry/wet crossfade; eight
overlapping grains can exceed unity.
*/

/// Circular buffer length in frames.
pub const BUFFER_SIZE: usize = 2048;
/// Number of grain slots.
pub const MAX_GRAINS: usize = 8;
/// Shortest grain, in samples (~5 ms).
pub const MIN_GRAIN_SIZE: usize = 240;
/// Longest grain, in samples (~40 ms).
pub const MAX_GRAIN_SIZE: usize = 1920;

const FIXED_ONE: f32 = 65536.0;
const MIN_SPAWN_RATE: f32 = 0.1;
const MAX_PITCH_SEMITONES: f32 = 24.0;
/// Fresh grains start at least 64 samples behind the write head.
const WRITE_HEAD_GUARD: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Grain {
    active: bool,
    start: usize,
    size: usize,
    /// 16.16 fixed-point read position relative to `start`.
    phase: u32,
    phase_increment: u32,
    /// 0..2: attack over 0..1, release over 1..2.
    envelope_phase: f32,
    envelope_increment: f32,
    gain_l: f32,
    gain_r: f32,
}

impl Grain {
    const IDLE: Grain = Grain {
        active: false,
        start: 0,
        size: 0,
        phase: 0,
        phase_increment: 0,
        envelope_phase: 2.0,
        envelope_increment: 0.0,
        gain_l: 0.0,
        gain_r: 0.0,
    };

    fn trigger(&mut self, start: usize, size: usize, ratio: f32, pan: f32) {
        self.start = start % BUFFER_SIZE;
        self.size = size;
        self.phase = 0;
        self.phase_increment = (ratio * FIXED_ONE) as u32;
        self.envelope_phase = 0.0;
        self.envelope_increment = 2.0 / size as f32;
        self.gain_l = 1.0 - pan;
        self.gain_r = pan;
        self.active = true;
    }

    #[inline]
    fn envelope(&self) -> f32 {
        let triangle = if self.envelope_phase >= 1.0 {
            2.0 - self.envelope_phase
        } else {
            self.envelope_phase
        };
        smoothstep(triangle.clamp(0.0, 1.0))
    }
}

pub struct GrainCloud {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_head: usize,
    grains: [Grain; MAX_GRAINS],
    scratch_l: [f32; MAX_BLOCK_SIZE],
    scratch_r: [f32; MAX_BLOCK_SIZE],
    rng: SmallRng,

    amount: f32,
    position: f32,
    size: f32,
    density: f32,
    pitch: f32,
    stereo_spread: f32,
    freeze: bool,
}

impl GrainCloud {
    pub fn new(seed: u64) -> Self {
        Self {
            buffer_l: vec![0.0; BUFFER_SIZE],
            buffer_r: vec![0.0; BUFFER_SIZE],
            write_head: 0,
            grains: [Grain::IDLE; MAX_GRAINS],
            scratch_l: [0.0; MAX_BLOCK_SIZE],
            scratch_r: [0.0; MAX_BLOCK_SIZE],
            rng: SmallRng::seed_from_u64(seed),
            amount: 0.0,
            position: 0.5,
            size: 0.5,
            density: 0.5,
            pitch: 0.0,
            stereo_spread: 0.3,
            freeze: false,
        }
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// 0.0 = most recent audio, 1.0 = oldest.
    pub fn set_position(&mut self, position: f32) {
        self.position = position.clamp(0.0, 1.0);
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(0.0, 1.0);
    }

    pub fn set_density(&mut self, density: f32) {
        self.density = density.clamp(0.0, 1.0);
    }

    /// Pitch of newly spawned grains, in semitones (±24).
    pub fn set_pitch(&mut self, semitones: f32) {
        self.pitch = semitones.clamp(-MAX_PITCH_SEMITONES, MAX_PITCH_SEMITONES);
    }

    pub fn set_stereo_spread(&mut self, spread: f32) {
        self.stereo_spread = spread.clamp(0.0, 1.0);
    }

    pub fn set_freeze(&mut self, freeze: bool) {
        self.freeze = freeze;
    }

    pub fn freeze(&self) -> bool {
        self.freeze
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn stereo_spread(&self) -> f32 {
        self.stereo_spread
    }

    pub fn active_grains(&self) -> usize {
        self.grains.iter().filter(|g| g.active).count()
    }

    /// The recorded audio, left and right.
    pub fn buffer(&self) -> (&[f32], &[f32]) {
        (&self.buffer_l, &self.buffer_r)
    }

    /// Write a block into the buffer without producing grains. Does
    /// nothing while frozen.
    pub fn record_block(&mut self, frames: &[Frame]) {
        if !self.freeze {
            self.record(frames);
        }
    }

    fn record(&mut self, frames: &[Frame]) {
        for frame in frames {
            // A frozen NaN would never leave the buffer
            self.buffer_l[self.write_head] = sanitize(frame.l);
            self.buffer_r[self.write_head] = sanitize(frame.r);
            self.write_head = (self.write_head + 1) % BUFFER_SIZE;
        }
    }

    fn grain_size_samples(&self) -> f32 {
        MIN_GRAIN_SIZE as f32 + self.size * (MAX_GRAIN_SIZE - MIN_GRAIN_SIZE) as f32
    }

    fn spawn(&mut self, block_len: usize) {
        let grain_size = self.grain_size_samples();
        let spawn_rate = (self.density * self.density * 4.0).max(MIN_SPAWN_RATE);
        let probability = spawn_rate * block_len as f32 / grain_size;

        if self.rng.gen::<f32>() >= probability {
            return;
        }
        let Some(slot) = self.grains.iter().position(|g| !g.active) else {
            return;
        };

        let grain_size = grain_size as usize;
        let max_offset = BUFFER_SIZE
            .saturating_sub(grain_size + WRITE_HEAD_GUARD)
            .max(WRITE_HEAD_GUARD);
        let jitter = self.rng.gen::<f32>() * max_offset as f32 * 0.1;
        let offset = ((self.position * max_offset as f32 + jitter) as usize).min(max_offset);
        let start = (self.write_head + 2 * BUFFER_SIZE - grain_size - offset) % BUFFER_SIZE;

        let pan = (0.5 + self.stereo_spread * (self.rng.gen::<f32>() - 0.5)).clamp(0.0, 1.0);
        let ratio = semitones_to_ratio(self.pitch);
        self.grains[slot].trigger(start, grain_size, ratio, pan);
    }

    fn render_chunk(&mut self, frames: &mut [Frame]) {
        let len = frames.len();

        if !self.freeze {
            self.record(frames);
        }
        self.spawn(len);

        let out_l = &mut self.scratch_l[..len];
        let out_r = &mut self.scratch_r[..len];
        out_l.fill(0.0);
        out_r.fill(0.0);

        for grain in self.grains.iter_mut().filter(|g| g.active) {
            for i in 0..len {
                let env = grain.envelope();
                grain.envelope_phase += grain.envelope_increment;
                if grain.envelope_phase >= 2.0 {
                    grain.active = false;
                    break;
                }

                let index = (grain.start + (grain.phase >> 16) as usize) % BUFFER_SIZE;
                let next = (index + 1) % BUFFER_SIZE;
                let frac = (grain.phase & 0xFFFF) as f32 / FIXED_ONE;

                let l = self.buffer_l[index] + (self.buffer_l[next] - self.buffer_l[index]) * frac;
                let r = self.buffer_r[index] + (self.buffer_r[next] - self.buffer_r[index]) * frac;
                out_l[i] += l * env * grain.gain_l;
                out_r[i] += r * env * grain.gain_r;

                grain.phase = grain.phase.wrapping_add(grain.phase_increment);
                if (grain.phase >> 16) as usize >= grain.size {
                    grain.active = false;
                    break;
                }
            }
        }

        let amount = self.amount;
        for (frame, (&l, &r)) in frames.iter_mut().zip(out_l.iter().zip(out_r.iter())) {
            frame.l += (soft_clip(l) - frame.l) * amount;
            frame.r += (soft_clip(r) - frame.r) * amount;
        }
    }
}

impl Stage for GrainCloud {
    fn render_block(&mut self, frames: &mut [Frame]) {
        if self.amount <= ACTIVE_THRESHOLD {
            // Keep recording so enabling grains later finds fresh audio
            self.record_block(frames);
            return;
        }

        for chunk in frames.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    fn clear(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_head = 0;
        self.grains = [Grain::IDLE; MAX_GRAINS];
    }

    fn amount(&self) -> f32 {
        self.amount
    }
}
